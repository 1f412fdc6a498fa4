//! Supervision of every watched livestream.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::downloader::LIVESTREAM_PARAMS;
use crate::job::{DownloadOutput, JobSpec};
use crate::metrics;
use crate::persistence::{self, PersistenceError};
use crate::queue::DispatchQueue;
use crate::registry::JobRegistry;

use super::types::LivestreamStatus;
use super::watcher::Watcher;
use super::LivestreamError;

type WatcherMap = Arc<RwLock<HashMap<String, Arc<Watcher>>>>;

/// Keeps one watcher per URL and forgets watchers once their probe exits.
pub struct LivestreamMonitor {
    program: PathBuf,
    download_dir: String,
    registry: Arc<JobRegistry>,
    queue: Arc<DispatchQueue>,
    watchers: WatcherMap,
    next_id: AtomicU64,
    persist_lock: Mutex<()>,
}

impl LivestreamMonitor {
    pub fn new(
        program: impl Into<PathBuf>,
        download_dir: impl Into<String>,
        registry: Arc<JobRegistry>,
        queue: Arc<DispatchQueue>,
    ) -> Self {
        Self {
            program: program.into(),
            download_dir: download_dir.into(),
            registry,
            queue,
            watchers: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            persist_lock: Mutex::new(()),
        }
    }

    /// Start watching `url`. Returns the id of the job created for it.
    pub async fn watch(&self, url: &str) -> Result<String, LivestreamError> {
        let url = url.trim().to_string();
        if url.is_empty() {
            return Err(LivestreamError::InvalidUrl);
        }

        let mut watchers = self.watchers.write().await;
        if watchers.contains_key(&url) {
            return Err(LivestreamError::AlreadyWatched(url));
        }

        let job = self
            .registry
            .put(JobSpec {
                url: url.clone(),
                params: LIVESTREAM_PARAMS.iter().map(|p| p.to_string()).collect(),
                output: DownloadOutput::resolve(None, None, &self.download_dir),
                livestream: true,
                title: None,
                created_at: None,
            })
            .await;
        let job_id = job.id().to_string();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let watcher = Arc::new(Watcher::new(id, url.clone(), job));
        watchers.insert(url.clone(), Arc::clone(&watcher));
        drop(watchers);
        metrics::LIVESTREAMS_WATCHED.inc();

        let program = self.program.clone();
        let queue = Arc::clone(&self.queue);
        let map = Arc::clone(&self.watchers);
        tokio::spawn(async move {
            watcher.run(program, queue).await;

            let mut watchers = map.write().await;
            if watchers.get(&watcher.url).is_some_and(|w| w.id == watcher.id) {
                watchers.remove(&watcher.url);
                metrics::LIVESTREAMS_WATCHED.dec();
                debug!("Watcher for {} finished", watcher.url);
            }
        });

        Ok(job_id)
    }

    /// Stop watching `url`.
    pub async fn unwatch(&self, url: &str) -> Result<(), LivestreamError> {
        let watcher = self
            .watchers
            .write()
            .await
            .remove(url)
            .ok_or_else(|| LivestreamError::NotWatched(url.to_string()))?;
        metrics::LIVESTREAMS_WATCHED.dec();

        watcher.kill().await.map_err(|e| LivestreamError::KillFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        info!("Stopped watching {}", url);
        Ok(())
    }

    /// Stop every watcher. Every one is attempted; the first error is
    /// returned.
    pub async fn unwatch_all(&self) -> Result<(), LivestreamError> {
        let urls: Vec<String> = self.watchers.read().await.keys().cloned().collect();
        let mut first_error = None;
        for url in urls {
            if let Err(e) = self.unwatch(&url).await {
                warn!("Failed to stop watching {}: {}", url, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub async fn status_all(&self) -> HashMap<String, LivestreamStatus> {
        let watchers: Vec<Arc<Watcher>> = self.watchers.read().await.values().cloned().collect();
        let mut statuses = HashMap::with_capacity(watchers.len());
        for watcher in watchers {
            statuses.insert(watcher.url.clone(), watcher.status().await);
        }
        statuses
    }

    pub async fn watched_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.watchers.read().await.keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Encode the watched URLs.
    pub async fn snapshot(&self) -> Result<Vec<u8>, PersistenceError> {
        persistence::encode(&self.watched_urls().await)
    }

    /// Watch every URL in a snapshot. Returns how many watchers started.
    pub async fn restore(&self, bytes: &[u8]) -> Result<usize, PersistenceError> {
        let urls: Vec<String> = persistence::decode(bytes)?;
        let mut started = 0;
        for url in urls {
            match self.watch(&url).await {
                Ok(_) => started += 1,
                Err(e) => debug!("Not restoring watcher for {}: {}", url, e),
            }
        }
        Ok(started)
    }

    pub async fn persist(&self, path: &Path) -> Result<(), PersistenceError> {
        let _guard = self.persist_lock.lock().await;
        let bytes = self.snapshot().await?;
        persistence::write_snapshot(path, &bytes).await
    }

    pub async fn restore_from(&self, path: &Path) -> Result<usize, PersistenceError> {
        let Some(bytes) = persistence::read_snapshot(path).await? else {
            return Ok(0);
        };
        let started = self.restore(&bytes).await?;
        info!("Restored {} livestream watchers from {:?}", started, path);
        Ok(started)
    }
}

//! Job service: the operations the transports expose.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::downloader::{Downloader, DownloaderError, FormatsInfo};
use crate::job::{DownloadProgress, DownloadRequest, JobSpec, JobStatus, JobSummary};
use crate::livestream::{LivestreamError, LivestreamMonitor, LivestreamStatus};
use crate::metrics;
use crate::persistence::PersistenceError;
use crate::playlist::{self, PlaylistError, PlaylistPlan};
use crate::queue::{DispatchQueue, QueueError, QueueStatus};
use crate::registry::{JobRegistry, RegistryError, RestoreReport};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Downloader(#[from] DownloaderError),

    #[error(transparent)]
    Playlist(#[from] PlaylistError),

    #[error(transparent)]
    Livestream(#[from] LivestreamError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl ServiceError {
    /// Unknown job id or unwatched livestream.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::Registry(RegistryError::NotFound(_))
                | ServiceError::Livestream(LivestreamError::NotWatched(_))
        )
    }

    /// Errors caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidRequest(_)
                | ServiceError::Playlist(PlaylistError::NotAValidSource { .. })
                | ServiceError::Livestream(
                    LivestreamError::InvalidUrl | LivestreamError::AlreadyWatched(_)
                )
                | ServiceError::Downloader(DownloaderError::NoLiveProcess { .. })
        )
    }
}

/// Where snapshots live.
#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    pub session: PathBuf,
    pub livestreams: PathBuf,
}

/// Outcome of a startup restore.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartupRestore {
    pub session: RestoreReport,
    pub livestreams: usize,
}

/// Facade over the registry, the queue, the downloader and the livestream
/// monitor.
pub struct JobService {
    download_dir: String,
    downloader: Arc<dyn Downloader>,
    registry: Arc<JobRegistry>,
    queue: Arc<DispatchQueue>,
    monitor: Arc<LivestreamMonitor>,
    snapshots: SnapshotPaths,
}

impl JobService {
    /// Wire every component from configuration.
    pub fn new(config: &Config, downloader: Arc<dyn Downloader>) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let queue = Arc::new(DispatchQueue::new(
            Arc::clone(&downloader),
            config.queue.download_concurrency(),
            config.queue.metadata_concurrency,
        ));
        let download_dir = config.downloader.download_path.display().to_string();
        let monitor = Arc::new(LivestreamMonitor::new(
            config.downloader.path.clone(),
            download_dir.clone(),
            Arc::clone(&registry),
            Arc::clone(&queue),
        ));

        Self {
            download_dir,
            downloader,
            registry,
            queue,
            monitor,
            snapshots: SnapshotPaths {
                session: config.persistence.session_path(),
                livestreams: config.persistence.livestream_path(),
            },
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &Arc<DispatchQueue> {
        &self.queue
    }

    pub fn monitor(&self) -> &Arc<LivestreamMonitor> {
        &self.monitor
    }

    pub fn downloader(&self) -> &Arc<dyn Downloader> {
        &self.downloader
    }

    /// Start the queue consumers.
    pub async fn start(&self) {
        self.queue.start().await;
    }

    fn validate(request: &DownloadRequest) -> Result<(), ServiceError> {
        if request.url.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("url cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Register and queue one download. Returns its id.
    pub async fn submit(&self, request: DownloadRequest) -> Result<String, ServiceError> {
        Self::validate(&request)?;
        let job = self
            .registry
            .put(JobSpec::from_request(&request, &self.download_dir))
            .await;
        self.queue.publish(Arc::clone(&job)).await?;

        metrics::JOBS_SUBMITTED.with_label_values(&["single"]).inc();
        info!("[{}] submitted {}", job.short_id(), job.url());
        Ok(job.id().to_string())
    }

    /// Submit every distinct item of a playlist, or the item itself when the
    /// source is a single item. Returns the ids created.
    pub async fn submit_playlist(
        &self,
        request: DownloadRequest,
    ) -> Result<Vec<String>, ServiceError> {
        Self::validate(&request)?;
        let entries = match playlist::inspect(self.downloader.as_ref(), &request).await? {
            PlaylistPlan::Single => return Ok(vec![self.submit(request).await?]),
            PlaylistPlan::Entries(entries) => entries,
        };

        info!("Expanding {} into {} jobs", request.url, entries.len());
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut spec = JobSpec::from_request(&entry.request, &self.download_dir);
            spec.title = entry.title;
            spec.created_at = Some(entry.created_at);

            let job = self.registry.put(spec).await;
            self.queue.publish(Arc::clone(&job)).await?;
            metrics::JOBS_SUBMITTED
                .with_label_values(&["playlist_entry"])
                .inc();
            ids.push(job.id().to_string());
        }
        Ok(ids)
    }

    /// Watch an upcoming livestream. Returns the id of its job.
    pub async fn submit_livestream(&self, url: &str) -> Result<String, ServiceError> {
        let id = self.monitor.watch(url).await?;
        metrics::JOBS_SUBMITTED.with_label_values(&["livestream"]).inc();
        Ok(id)
    }

    pub async fn progress(&self, id: &str) -> Result<DownloadProgress, ServiceError> {
        Ok(self.registry.get(id).await?.progress().await)
    }

    pub async fn summary(&self, id: &str) -> Result<JobSummary, ServiceError> {
        Ok(self.registry.get(id).await?.summary().await)
    }

    pub async fn list(&self) -> Vec<JobSummary> {
        self.registry.list_all().await
    }

    pub async fn list_ids(&self) -> Vec<String> {
        self.registry.list_ids().await
    }

    /// Ids of jobs in the given status.
    async fn ids_with_status(&self, wanted: JobStatus) -> Vec<String> {
        let mut ids = Vec::new();
        for summary in self.registry.list_all().await {
            if summary.progress.status == wanted {
                ids.push(summary.id);
            }
        }
        ids
    }

    pub async fn running(&self) -> Vec<String> {
        self.ids_with_status(JobStatus::Downloading).await
    }

    pub async fn pending(&self) -> Vec<String> {
        self.ids_with_status(JobStatus::Pending).await
    }

    /// Terminate a running job. The job stays registered as Completed.
    pub async fn kill(&self, id: &str) -> Result<(), ServiceError> {
        let job = self.registry.get(id).await?;
        match self.downloader.kill(&job).await {
            Ok(()) => {
                metrics::KILLS.with_label_values(&["killed"]).inc();
                Ok(())
            }
            Err(e) => {
                let result = match e {
                    DownloaderError::NoLiveProcess { .. } => "no_process",
                    _ => "failed",
                };
                metrics::KILLS.with_label_values(&[result]).inc();
                Err(e.into())
            }
        }
    }

    /// Drop everything queued and terminate everything running.
    ///
    /// Queued jobs are marked Completed. Individual failures are logged and
    /// do not stop the sweep.
    pub async fn kill_all(&self) -> Result<usize, ServiceError> {
        self.queue.drain();

        let mut stopped = 0;
        for job in self.registry.jobs().await {
            if job.live_process().await.is_some() {
                match self.downloader.kill(&job).await {
                    Ok(()) => {
                        metrics::KILLS.with_label_values(&["killed"]).inc();
                        stopped += 1;
                    }
                    Err(e) => warn!("[{}] kill failed: {}", job.short_id(), e),
                }
            } else if job.status().await == JobStatus::Pending {
                job.mark_completed().await;
                stopped += 1;
            }
        }
        info!("Stopped {} jobs", stopped);
        Ok(stopped)
    }

    /// Remove a job from the registry, terminating it first if running.
    ///
    /// A job still waiting in the queue is marked Completed so the download
    /// lane drops it instead of running an unregistered job.
    pub async fn clear(&self, id: &str) -> Result<(), ServiceError> {
        let job = self.registry.get(id).await?;
        if job.live_process().await.is_some() {
            if let Err(e) = self.downloader.kill(&job).await {
                warn!("[{}] kill before clear failed: {}", job.short_id(), e);
            }
        }
        if !job.status().await.is_terminal() {
            job.mark_completed().await;
        }
        self.registry.delete(id).await;
        Ok(())
    }

    pub async fn formats(&self, url: &str) -> Result<FormatsInfo, ServiceError> {
        if url.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("url cannot be empty".to_string()));
        }
        Ok(self.downloader.fetch_formats(url).await?)
    }

    pub async fn livestream_status(&self) -> HashMap<String, LivestreamStatus> {
        self.monitor.status_all().await
    }

    pub async fn kill_livestream(&self, url: &str) -> Result<(), ServiceError> {
        Ok(self.monitor.unwatch(url).await?)
    }

    pub async fn kill_all_livestreams(&self) -> Result<(), ServiceError> {
        Ok(self.monitor.unwatch_all().await?)
    }

    pub async fn version(&self) -> Result<String, ServiceError> {
        Ok(self.downloader.version().await?)
    }

    pub async fn update_executable(&self) -> Result<String, ServiceError> {
        let output = self.downloader.update().await?;
        info!("Downloader update finished");
        Ok(output)
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Write both snapshots. Both are attempted; the first error is returned.
    pub async fn persist(&self) -> Result<(), ServiceError> {
        let session = self.registry.persist(&self.snapshots.session).await;
        record_persist("session", &session);
        let livestreams = self.monitor.persist(&self.snapshots.livestreams).await;
        record_persist("livestreams", &livestreams);

        session?;
        livestreams?;
        Ok(())
    }

    /// Load both snapshots. Missing files restore nothing.
    pub async fn restore(&self) -> Result<StartupRestore, ServiceError> {
        let session = self
            .registry
            .restore_from(&self.snapshots.session, &self.queue)
            .await?;
        let livestreams = self.monitor.restore_from(&self.snapshots.livestreams).await?;
        Ok(StartupRestore {
            session,
            livestreams,
        })
    }
}

fn record_persist(target: &str, result: &Result<(), PersistenceError>) {
    let outcome = match result {
        Ok(()) => "ok",
        Err(e) => {
            warn!("Failed to persist {}: {}", target, e);
            "failed"
        }
    };
    metrics::PERSISTS.with_label_values(&[target, outcome]).inc();
}

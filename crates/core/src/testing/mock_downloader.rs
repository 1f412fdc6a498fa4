//! Mock downloader for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

use crate::downloader::{Downloader, DownloaderError, FormatsInfo};
use crate::job::{DownloadInfo, Job};

/// Mock implementation of the Downloader trait.
///
/// Provides controllable behavior for testing:
/// - Measure how many downloads run at once
/// - Hold downloads until released or killed
/// - Control metadata, playlist and format responses
///
/// # Example
///
/// ```rust,ignore
/// use mediaq_core::testing::MockDownloader;
///
/// let downloader = MockDownloader::new();
/// downloader.set_download_duration(Duration::from_millis(50)).await;
///
/// // Use as Arc<dyn Downloader> in a DispatchQueue...
///
/// assert!(downloader.max_concurrent() <= 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockDownloader {
    /// URLs downloaded, in start order.
    downloads: Arc<RwLock<Vec<String>>>,
    /// Simulated download duration. `None` holds until released.
    download_duration: Arc<RwLock<Option<Duration>>>,
    /// Per-job wake-ups for release and kill.
    wakers: Arc<RwLock<HashMap<String, Arc<Notify>>>>,
    /// Metadata responses by URL.
    metadata: Arc<RwLock<HashMap<String, DownloadInfo>>>,
    /// Playlist listings by URL.
    playlists: Arc<RwLock<HashMap<String, String>>>,
    formats: Arc<RwLock<Option<FormatsInfo>>>,
    /// URLs metadata was requested for.
    metadata_requests: Arc<RwLock<Vec<String>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    next_pid: Arc<AtomicU32>,
}

impl Default for MockDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloader {
    /// Create a new mock downloader with a 10ms download duration.
    pub fn new() -> Self {
        Self {
            downloads: Arc::new(RwLock::new(Vec::new())),
            download_duration: Arc::new(RwLock::new(Some(Duration::from_millis(10)))),
            wakers: Arc::new(RwLock::new(HashMap::new())),
            metadata: Arc::new(RwLock::new(HashMap::new())),
            playlists: Arc::new(RwLock::new(HashMap::new())),
            formats: Arc::new(RwLock::new(None)),
            metadata_requests: Arc::new(RwLock::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            next_pid: Arc::new(AtomicU32::new(10_000)),
        }
    }

    /// Set the simulated download duration.
    pub async fn set_download_duration(&self, duration: Duration) {
        *self.download_duration.write().await = Some(duration);
    }

    /// Hold every download until `release` or a kill.
    pub async fn hold_downloads(&self) {
        *self.download_duration.write().await = None;
    }

    /// Let a held download finish.
    pub async fn release(&self, job_id: &str) {
        self.waker(job_id).await.notify_one();
    }

    pub async fn set_metadata(&self, url: &str, info: DownloadInfo) {
        self.metadata.write().await.insert(url.to_string(), info);
    }

    pub async fn set_playlist(&self, url: &str, listing: &str) {
        self.playlists
            .write()
            .await
            .insert(url.to_string(), listing.to_string());
    }

    pub async fn set_formats(&self, formats: FormatsInfo) {
        *self.formats.write().await = Some(formats);
    }

    /// URLs downloaded so far, in start order.
    pub async fn downloaded_urls(&self) -> Vec<String> {
        self.downloads.read().await.clone()
    }

    pub async fn metadata_requests(&self) -> Vec<String> {
        self.metadata_requests.read().await.clone()
    }

    /// Downloads running right now.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of downloads seen running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn waker(&self, job_id: &str) -> Arc<Notify> {
        let mut wakers = self.wakers.write().await;
        Arc::clone(
            wakers
                .entry(job_id.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn download(&self, job: Arc<Job>) -> Result<(), DownloaderError> {
        self.downloads.write().await.push(job.url().to_string());
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        job.attach_process(pid).await;
        job.apply_progress("50.0%", 1024.0, 1.0).await;

        let waker = self.waker(job.id()).await;
        let duration = *self.download_duration.read().await;
        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = waker.notified() => {}
                }
            }
            None => waker.notified().await,
        }

        job.detach_process().await;
        job.mark_completed().await;
        let output = job.output().await;
        job.set_saved_path(format!("{}/{}.mp4", output.path, job.short_id()))
            .await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn kill(&self, job: &Job) -> Result<(), DownloaderError> {
        if job.live_process().await.is_none() {
            return Err(DownloaderError::no_live_process(job.id()));
        }
        job.detach_process().await;
        job.mark_completed().await;
        self.waker(job.id()).await.notify_one();
        Ok(())
    }

    async fn fetch_metadata(&self, url: &str) -> Result<DownloadInfo, DownloaderError> {
        self.metadata_requests.write().await.push(url.to_string());
        self.metadata
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| DownloaderError::decode(format!("no metadata for {}", url)))
    }

    async fn fetch_formats(&self, _url: &str) -> Result<FormatsInfo, DownloaderError> {
        Ok(self.formats.read().await.clone().unwrap_or_default())
    }

    async fn fetch_playlist(&self, url: &str) -> Result<String, DownloaderError> {
        Ok(self
            .playlists
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or_else(|| r#"{"_type": "video"}"#.to_string()))
    }

    async fn version(&self) -> Result<String, DownloaderError> {
        Ok("mock-2024.01.01".to_string())
    }

    async fn update(&self) -> Result<String, DownloaderError> {
        Ok("mock is up to date".to_string())
    }
}

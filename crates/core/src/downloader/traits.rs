//! Trait definitions for the downloader module.

use async_trait::async_trait;
use std::sync::Arc;

use crate::job::{DownloadInfo, Job};

use super::error::DownloaderError;
use super::formats::FormatsInfo;

/// Runs the external downloader on behalf of jobs.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// Run one job to completion.
    ///
    /// Progress is written into the job as it is parsed. When the process
    /// exits the job is Completed, whatever the exit status. Spawn and
    /// stream failures leave it Errored.
    async fn download(&self, job: Arc<Job>) -> Result<(), DownloaderError>;

    /// Terminate a running job's process group and mark it Completed.
    ///
    /// Fails with `NoLiveProcess` when nothing is running, leaving the job
    /// untouched.
    async fn kill(&self, job: &Job) -> Result<(), DownloaderError>;

    /// Dump one item's metadata.
    async fn fetch_metadata(&self, url: &str) -> Result<DownloadInfo, DownloaderError>;

    /// List available formats and the default pick.
    async fn fetch_formats(&self, url: &str) -> Result<FormatsInfo, DownloaderError>;

    /// Raw flattened listing for a possibly multi-item source.
    async fn fetch_playlist(&self, url: &str) -> Result<String, DownloaderError>;

    /// Version string of the executable.
    async fn version(&self) -> Result<String, DownloaderError>;

    /// Run the executable's self-update.
    async fn update(&self) -> Result<String, DownloaderError>;
}

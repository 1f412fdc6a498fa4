//! A single download job and its mutable state.

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::types::{
    DownloadInfo, DownloadOutput, DownloadProgress, JobSpec, JobStatus, JobSummary,
    COMPLETED_PERCENTAGE,
};

#[derive(Debug)]
struct JobState {
    progress: DownloadProgress,
    info: DownloadInfo,
    output: DownloadOutput,
    error: Option<String>,
}

/// A registered job.
///
/// Identity fields never change after registration. Progress, metadata and
/// output sit behind one lock that is only held for field reads and writes.
/// The process group id is present only while a subprocess is running.
#[derive(Debug)]
pub struct Job {
    id: String,
    url: String,
    params: Vec<String>,
    livestream: bool,
    state: RwLock<JobState>,
    process: Mutex<Option<u32>>,
}

impl Job {
    pub(crate) fn new(id: String, spec: JobSpec) -> Self {
        let created_at = spec.created_at.unwrap_or_else(Utc::now);
        let mut info = DownloadInfo::placeholder(&spec.url, created_at);
        if let Some(title) = spec.title.filter(|t| !t.is_empty()) {
            info.title = title;
        }

        let status = if spec.livestream {
            JobStatus::LivestreamWaiting
        } else {
            JobStatus::Pending
        };

        Self {
            id,
            url: spec.url,
            params: spec.params,
            livestream: spec.livestream,
            state: RwLock::new(JobState {
                progress: DownloadProgress {
                    status,
                    ..Default::default()
                },
                info,
                output: spec.output,
                error: None,
            }),
            process: Mutex::new(None),
        }
    }

    pub(crate) fn from_summary(summary: JobSummary) -> Self {
        let url = summary.info.url.clone();
        Self {
            id: summary.id,
            url,
            params: summary.params,
            livestream: summary.livestream,
            state: RwLock::new(JobState {
                progress: summary.progress,
                info: summary.info,
                output: summary.output,
                error: summary.error,
            }),
            process: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// First segment of the id, for log lines.
    pub fn short_id(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_livestream(&self) -> bool {
        self.livestream
    }

    pub async fn status(&self) -> JobStatus {
        self.state.read().await.progress.status
    }

    pub async fn progress(&self) -> DownloadProgress {
        self.state.read().await.progress.clone()
    }

    pub async fn info(&self) -> DownloadInfo {
        self.state.read().await.info.clone()
    }

    pub async fn output(&self) -> DownloadOutput {
        self.state.read().await.output.clone()
    }

    pub async fn saved_file_path(&self) -> Option<String> {
        self.state.read().await.output.saved_file_path.clone()
    }

    /// Mark the job as waiting for a download slot.
    pub async fn set_pending(&self) {
        let mut state = self.state.write().await;
        state.progress.status = JobStatus::Pending;
    }

    /// Overwrite progress with a freshly parsed tick.
    ///
    /// Ticks arriving after the job reached a terminal status are dropped,
    /// so a killed job stays Completed while its process winds down.
    pub async fn apply_progress(&self, percentage: &str, speed: f64, eta: f64) {
        let mut state = self.state.write().await;
        if state.progress.status.is_terminal() {
            return;
        }
        state.progress = DownloadProgress {
            status: JobStatus::Downloading,
            percentage: percentage.trim().to_string(),
            speed,
            eta,
        };
    }

    pub async fn set_saved_path(&self, path: impl Into<String>) {
        let mut state = self.state.write().await;
        state.output.saved_file_path = Some(path.into());
    }

    /// Finish the job. An Errored job keeps its status.
    pub async fn mark_completed(&self) {
        let mut state = self.state.write().await;
        if state.progress.status == JobStatus::Errored {
            return;
        }
        state.progress = DownloadProgress {
            status: JobStatus::Completed,
            percentage: COMPLETED_PERCENTAGE.to_string(),
            speed: 0.0,
            eta: 0.0,
        };
    }

    pub async fn mark_errored(&self, error: impl Into<String>) {
        let mut state = self.state.write().await;
        state.progress.status = JobStatus::Errored;
        state.progress.speed = 0.0;
        state.progress.eta = 0.0;
        state.error = Some(error.into());
    }

    /// Replace metadata with what the downloader reported.
    ///
    /// The requested URL and the creation time are kept, and an empty title
    /// falls back to the current one.
    pub async fn set_info(&self, mut info: DownloadInfo) {
        let mut state = self.state.write().await;
        info.url = self.url.clone();
        info.created_at = state.info.created_at;
        if info.title.is_empty() {
            info.title = state.info.title.clone();
        }
        state.info = info;
    }

    pub async fn set_created_at(&self, created_at: DateTime<Utc>) {
        self.state.write().await.info.created_at = created_at;
    }

    pub async fn created_at(&self) -> DateTime<Utc> {
        self.state.read().await.info.created_at
    }

    pub(crate) async fn attach_process(&self, pgid: u32) {
        *self.process.lock().await = Some(pgid);
    }

    pub(crate) async fn detach_process(&self) -> Option<u32> {
        self.process.lock().await.take()
    }

    /// Process group id of the running subprocess, if any.
    pub async fn live_process(&self) -> Option<u32> {
        *self.process.lock().await
    }

    pub async fn summary(&self) -> JobSummary {
        let state = self.state.read().await;
        JobSummary {
            id: self.id.clone(),
            progress: state.progress.clone(),
            info: state.info.clone(),
            output: state.output.clone(),
            params: self.params.clone(),
            livestream: self.livestream,
            error: state.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(url: &str) -> JobSpec {
        JobSpec {
            url: url.to_string(),
            params: vec!["-f".to_string(), "best".to_string()],
            output: DownloadOutput::resolve(None, None, "/tmp"),
            livestream: false,
            title: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_new_job_is_pending_with_placeholder_title() {
        let job = Job::new("abc-def".to_string(), spec("https://example.com/v"));
        assert_eq!(job.status().await, JobStatus::Pending);
        assert_eq!(job.info().await.title, "https://example.com/v");
        assert_eq!(job.short_id(), "abc");
    }

    #[tokio::test]
    async fn test_livestream_job_starts_waiting() {
        let mut s = spec("https://example.com/live");
        s.livestream = true;
        let job = Job::new("id".to_string(), s);
        assert_eq!(job.status().await, JobStatus::LivestreamWaiting);
    }

    #[tokio::test]
    async fn test_progress_moves_to_downloading() {
        let job = Job::new("id".to_string(), spec("u"));
        job.apply_progress("  42.0%", 1024.0, 12.0).await;
        let progress = job.progress().await;
        assert_eq!(progress.status, JobStatus::Downloading);
        assert_eq!(progress.percentage, "42.0%");
        assert_eq!(progress.speed, 1024.0);
    }

    #[tokio::test]
    async fn test_completed_convention() {
        let job = Job::new("id".to_string(), spec("u"));
        job.apply_progress("50%", 10.0, 5.0).await;
        job.mark_completed().await;
        let progress = job.progress().await;
        assert_eq!(progress.status, JobStatus::Completed);
        assert_eq!(progress.percentage, COMPLETED_PERCENTAGE);
        assert_eq!(progress.speed, 0.0);
        assert_eq!(progress.eta, 0.0);
    }

    #[tokio::test]
    async fn test_progress_after_completion_is_dropped() {
        let job = Job::new("id".to_string(), spec("u"));
        job.mark_completed().await;
        job.apply_progress("99%", 10.0, 1.0).await;
        assert_eq!(job.progress().await.percentage, COMPLETED_PERCENTAGE);
    }

    #[tokio::test]
    async fn test_errored_is_sticky() {
        let job = Job::new("id".to_string(), spec("u"));
        job.mark_errored("spawn failed").await;
        job.mark_completed().await;
        let summary = job.summary().await;
        assert_eq!(summary.progress.status, JobStatus::Errored);
        assert_eq!(summary.error.as_deref(), Some("spawn failed"));
    }

    #[tokio::test]
    async fn test_set_info_keeps_identity() {
        let job = Job::new("id".to_string(), spec("https://example.com/v"));
        let created_at = job.created_at().await;

        let mut info = DownloadInfo::placeholder("https://cdn.example.com/media.mp4", Utc::now());
        info.title = "Real Title".to_string();
        job.set_info(info).await;

        let info = job.info().await;
        assert_eq!(info.title, "Real Title");
        assert_eq!(info.url, "https://example.com/v");
        assert_eq!(info.created_at, created_at);
    }

    #[tokio::test]
    async fn test_process_handle_lifecycle() {
        let job = Job::new("id".to_string(), spec("u"));
        assert!(job.live_process().await.is_none());
        job.attach_process(4242).await;
        assert_eq!(job.live_process().await, Some(4242));
        assert_eq!(job.detach_process().await, Some(4242));
        assert!(job.detach_process().await.is_none());
    }

    #[tokio::test]
    async fn test_summary_round_trips_into_job() {
        let job = Job::new("id-1".to_string(), spec("https://example.com/v"));
        job.apply_progress("10%", 1.0, 2.0).await;
        job.set_saved_path("/tmp/file.mp4").await;
        let summary = job.summary().await;

        let restored = Job::from_summary(summary.clone());
        assert_eq!(restored.id(), "id-1");
        assert_eq!(restored.url(), "https://example.com/v");
        assert_eq!(restored.summary().await, summary);
    }
}

//! Job data types shared by the registry, the queue and the transports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percentage reported by a finished job.
pub const COMPLETED_PERCENTAGE: &str = "-1";

/// Filename template used when the caller does not rename the output.
pub const DEFAULT_FILENAME_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Errored,
    LivestreamWaiting,
}

impl JobStatus {
    /// Completed and Errored jobs never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Errored)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Errored => "errored",
            JobStatus::LivestreamWaiting => "livestream_waiting",
        }
    }
}

/// Last parsed progress tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub status: JobStatus,
    pub percentage: String,
    pub speed: f64,
    pub eta: f64,
}

impl Default for DownloadProgress {
    fn default() -> Self {
        Self {
            status: JobStatus::Pending,
            percentage: String::new(),
            speed: 0.0,
            eta: 0.0,
        }
    }
}

/// Where a job writes its file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadOutput {
    /// Save directory.
    pub path: String,
    /// Filename template handed to the downloader.
    pub filename: String,
    /// Final file path once the downloader reports it.
    #[serde(default)]
    pub saved_file_path: Option<String>,
}

impl DownloadOutput {
    /// Resolve the output for a request.
    ///
    /// A rename lacking the extension placeholder gets it appended so the
    /// downloader keeps the real container extension.
    pub fn resolve(path: Option<&str>, rename: Option<&str>, default_dir: &str) -> Self {
        let path = path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(default_dir)
            .to_string();

        let filename = match rename.map(str::trim).filter(|r| !r.is_empty()) {
            Some(rename) if rename.ends_with(".%(ext)s") => rename.to_string(),
            Some(rename) => format!("{}.%(ext)s", rename),
            None => DEFAULT_FILENAME_TEMPLATE.to_string(),
        };

        Self {
            path,
            filename,
            saved_file_path: None,
        }
    }
}

/// Descriptive metadata for a job, as reported by the downloader's JSON dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DownloadInfo {
    /// Metadata for a job whose details are not known yet.
    pub fn placeholder(url: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            title: url.to_string(),
            thumbnail: None,
            resolution: None,
            filesize_approx: None,
            vcodec: None,
            acodec: None,
            ext: None,
            original_url: None,
            created_at,
        }
    }
}

/// Point-in-time view of a job. Used for listings and session snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub progress: DownloadProgress,
    pub info: DownloadInfo,
    pub output: DownloadOutput,
    pub params: Vec<String>,
    #[serde(default)]
    pub livestream: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Submission payload accepted from the transports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Everything needed to register a new job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub url: String,
    pub params: Vec<String>,
    pub output: DownloadOutput,
    pub livestream: bool,
    /// Title shown until metadata arrives. Defaults to the URL.
    pub title: Option<String>,
    /// Creation time. Defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

impl JobSpec {
    pub fn from_request(request: &DownloadRequest, default_dir: &str) -> Self {
        Self {
            url: request.url.trim().to_string(),
            params: request.params.clone(),
            output: DownloadOutput::resolve(
                request.path.as_deref(),
                request.rename.as_deref(),
                default_dir,
            ),
            livestream: false,
            title: None,
            created_at: None,
        }
    }
}

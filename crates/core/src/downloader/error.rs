//! Error types for the downloader module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while driving the external downloader.
#[derive(Debug, Error)]
pub enum DownloaderError {
    /// Executable not found.
    #[error("Downloader not found at path: {path}")]
    NotFound { path: PathBuf },

    /// Could not attach to the subprocess output.
    #[error("Downloader output stream unavailable")]
    StreamUnavailable,

    /// A bounded call ran past its deadline.
    #[error("Downloader timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Subprocess exited unsuccessfully.
    #[error("Downloader exited with code {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    /// Output did not have the expected shape.
    #[error("Failed to decode downloader output: {reason}")]
    Decode { reason: String },

    /// Kill requested for a job without a running subprocess.
    #[error("No live process for job {id}")]
    NoLiveProcess { id: String },

    /// Signal delivery failed.
    #[error("Failed to terminate process group {pgid}: {reason}")]
    Signal { pgid: u32, reason: String },

    /// I/O error while talking to the subprocess.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloaderError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn no_live_process(id: impl Into<String>) -> Self {
        Self::NoLiveProcess { id: id.into() }
    }

    /// Map a spawn failure, naming the executable when it is missing.
    pub fn spawn(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(err)
        }
    }
}

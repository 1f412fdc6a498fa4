//! Job model.
//!
//! A job is one invocation of the external downloader for one URL. Its
//! status only moves forward: Pending, then Downloading, then Completed.
//! Errored is reachable from any non-terminal status. Livestream jobs start
//! in LivestreamWaiting until their watcher sees the stream go live.

mod job;
mod types;

pub use job::Job;
pub use types::{
    DownloadInfo, DownloadOutput, DownloadProgress, DownloadRequest, JobSpec, JobStatus,
    JobSummary, COMPLETED_PERCENTAGE, DEFAULT_FILENAME_TEMPLATE,
};

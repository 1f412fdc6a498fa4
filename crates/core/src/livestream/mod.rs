//! Livestream monitor.
//!
//! Upcoming streams are probed with the downloader's wait-for-video mode.
//! Once a stream starts, its job joins the dispatch queue like any other.

mod monitor;
mod timespan;
mod types;
mod watcher;

pub use monitor::LivestreamMonitor;
pub use timespan::{next_token, parse_time_span, Countdown};
pub use types::{LivestreamStatus, WatcherState};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LivestreamError {
    #[error("Livestream URL cannot be empty")]
    InvalidUrl,

    #[error("Livestream already watched: {0}")]
    AlreadyWatched(String),

    #[error("Livestream not watched: {0}")]
    NotWatched(String),

    #[error("Failed to stop watching {url}: {reason}")]
    KillFailed { url: String, reason: String },

    #[error("Invalid countdown: {0}")]
    InvalidCountdown(String),
}

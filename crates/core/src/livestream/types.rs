use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of one livestream watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    #[default]
    Waiting,
    InProgress,
    Completed,
    Errored,
}

/// Point-in-time view of a watcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LivestreamStatus {
    pub state: WatcherState,
    /// Seconds until the next expected start, from the last countdown seen.
    pub wait_time_secs: u64,
    /// Projected start time.
    pub live_date: Option<DateTime<Utc>>,
    /// Job created for the stream.
    pub job_id: String,
}

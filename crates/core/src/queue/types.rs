//! Types for the dispatch queue.

use serde::{Deserialize, Serialize};

/// Status of one consumer lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneStatus {
    /// Lane name ("download" or "metadata").
    pub name: String,
    /// Entries currently executing.
    pub active: usize,
    /// Concurrency ceiling.
    pub max_concurrent: usize,
    /// Entries admitted but not yet executing.
    pub queued: usize,
    /// Entries finished successfully since startup.
    pub total_processed: u64,
    /// Entries that failed since startup.
    pub total_failed: u64,
}

/// Overall queue status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub running: bool,
    pub download: LaneStatus,
    pub metadata: LaneStatus,
}

/// Dispatch queue errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The lane consumers are gone.
    #[error("Dispatch queue is closed")]
    Closed,
}

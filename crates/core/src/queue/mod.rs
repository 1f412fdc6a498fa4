//! Dispatch queue: admission control between submissions and the downloader.

mod dispatch;
mod types;

pub use dispatch::DispatchQueue;
pub use types::{LaneStatus, QueueError, QueueStatus};

//! Transport adapters over the job orchestration core.

pub mod api;
pub mod metrics;
pub mod state;

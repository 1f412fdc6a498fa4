//! In-memory job registry with snapshot persistence.

mod memory;
mod snapshot;

pub use memory::JobRegistry;
pub use snapshot::RestoreReport;

use thiserror::Error;

/// Registry lookup errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job not found: {0}")]
    NotFound(String),
}

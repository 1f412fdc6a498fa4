use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::job::{Job, JobStatus, JobSummary};
use crate::persistence::{self, PersistenceError};
use crate::queue::DispatchQueue;

use super::JobRegistry;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    version: u32,
    jobs: Vec<JobSummary>,
}

/// Outcome of a session restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Jobs inserted into the registry.
    pub restored: usize,
    /// Restored jobs handed back to the dispatch queue.
    pub republished: usize,
}

impl JobRegistry {
    /// Encode every job summary.
    ///
    /// Jobs still waiting on a livestream are left out; the livestream
    /// watch-list recreates them.
    pub async fn snapshot(&self) -> Result<Vec<u8>, PersistenceError> {
        let jobs = self
            .list_all()
            .await
            .into_iter()
            .filter(|s| s.progress.status != JobStatus::LivestreamWaiting)
            .collect();

        persistence::encode(&SessionSnapshot {
            version: SNAPSHOT_VERSION,
            jobs,
        })
    }

    /// Decode a snapshot into this registry.
    ///
    /// Unfinished jobs are published to `queue` once each, since their
    /// processes did not survive the restart. Ids already present are
    /// skipped.
    pub async fn restore(
        &self,
        bytes: &[u8],
        queue: &DispatchQueue,
    ) -> Result<RestoreReport, PersistenceError> {
        let snapshot: SessionSnapshot = persistence::decode(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                "Session snapshot version {} differs from {}, restoring anyway",
                snapshot.version, SNAPSHOT_VERSION
            );
        }

        let mut report = RestoreReport::default();
        for summary in snapshot.jobs {
            let resume = !summary.progress.status.is_terminal();
            let job = Arc::new(Job::from_summary(summary));

            if !self.insert(Arc::clone(&job)).await {
                debug!("Job {} already registered, skipping", job.id());
                continue;
            }
            report.restored += 1;

            if resume {
                match queue.publish(Arc::clone(&job)).await {
                    Ok(()) => report.republished += 1,
                    Err(e) => warn!("Failed to republish job {}: {}", job.short_id(), e),
                }
            }
        }

        Ok(report)
    }

    /// Write the session snapshot to `path`. Concurrent calls are serialized.
    pub async fn persist(&self, path: &Path) -> Result<(), PersistenceError> {
        let _guard = self.persist_lock.lock().await;
        let bytes = self.snapshot().await?;
        persistence::write_snapshot(path, &bytes).await?;
        debug!("Persisted session to {:?} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Restore from `path`. A missing file restores nothing.
    pub async fn restore_from(
        &self,
        path: &Path,
        queue: &DispatchQueue,
    ) -> Result<RestoreReport, PersistenceError> {
        let Some(bytes) = persistence::read_snapshot(path).await? else {
            info!("No session file at {:?}, starting empty", path);
            return Ok(RestoreReport::default());
        };
        let report = self.restore(&bytes, queue).await?;
        info!(
            "Restored {} jobs from {:?}, {} resumed",
            report.restored, path, report.republished
        );
        Ok(report)
    }
}

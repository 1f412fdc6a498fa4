use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::job::{Job, JobSpec, JobSummary};

use super::RegistryError;

/// Concurrent map of every known job, keyed by id.
///
/// The map lock is only held while the map itself is read or written. Job
/// state is read after the lock is released.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<Job>>>,
    /// Serializes snapshot writes.
    pub(super) persist_lock: Mutex<()>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job under a fresh id.
    pub async fn put(&self, spec: JobSpec) -> Arc<Job> {
        let id = Uuid::new_v4().to_string();
        let job = Arc::new(Job::new(id.clone(), spec));
        self.jobs.write().await.insert(id, Arc::clone(&job));
        job
    }

    /// Insert an existing job. Returns false when the id is already taken.
    pub(crate) async fn insert(&self, job: Arc<Job>) -> bool {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job.id()) {
            return false;
        }
        jobs.insert(job.id().to_string(), job);
        true
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Job>, RegistryError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Remove a job. Deleting an unknown id is a no-op.
    pub async fn delete(&self, id: &str) -> Option<Arc<Job>> {
        self.jobs.write().await.remove(id)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.jobs.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Every stored job.
    pub async fn jobs(&self) -> Vec<Arc<Job>> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn list_ids(&self) -> Vec<String> {
        self.jobs.read().await.keys().cloned().collect()
    }

    /// Summaries of every job, oldest first.
    pub async fn list_all(&self) -> Vec<JobSummary> {
        let jobs = self.jobs().await;
        let mut summaries = Vec::with_capacity(jobs.len());
        for job in jobs {
            summaries.push(job.summary().await);
        }
        summaries.sort_by(|a, b| {
            a.info
                .created_at
                .cmp(&b.info.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }
}

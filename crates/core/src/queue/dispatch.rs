//! Bounded-concurrency dispatch of jobs to the downloader.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify, Semaphore};
use tracing::{debug, info, warn};

use crate::downloader::Downloader;
use crate::job::Job;
use crate::metrics;

use super::types::{LaneStatus, QueueError, QueueStatus};

/// Tracks statistics for one lane.
#[derive(Default)]
struct LaneStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl LaneStats {
    fn to_status(&self, name: &str, max_concurrent: usize) -> LaneStatus {
        LaneStatus {
            name: name.to_string(),
            active: self.active.load(Ordering::Relaxed) as usize,
            max_concurrent,
            queued: self.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// A job admitted to a lane.
struct Entry {
    job: Arc<Job>,
    epoch: u64,
}

#[derive(Clone, Copy)]
enum LaneKind {
    Download,
    Metadata,
}

impl LaneKind {
    fn name(&self) -> &'static str {
        match self {
            LaneKind::Download => "download",
            LaneKind::Metadata => "metadata",
        }
    }
}

/// Everything a lane consumer needs.
#[derive(Clone)]
struct Lane {
    kind: LaneKind,
    semaphore: Arc<Semaphore>,
    stats: Arc<LaneStats>,
    downloader: Arc<dyn Downloader>,
    epoch: Arc<AtomicU64>,
    drained: Arc<Notify>,
}

struct Receivers {
    download: mpsc::UnboundedReceiver<Entry>,
    livestream: mpsc::UnboundedReceiver<Entry>,
    metadata: mpsc::UnboundedReceiver<Entry>,
}

/// Two independent lanes feeding the downloader.
///
/// The download lane admits at most `download_limit` subprocesses at once.
/// The metadata lane runs metadata fetches under its own, smaller limit.
/// Each published job enters both lanes; admission within a lane is FIFO.
/// Livestream jobs skip the download ceiling: they travel on their own
/// channel so a backlog of ordinary downloads never sits in front of them.
pub struct DispatchQueue {
    downloader: Arc<dyn Downloader>,
    download_limit: usize,
    metadata_limit: usize,
    download_semaphore: Arc<Semaphore>,
    metadata_semaphore: Arc<Semaphore>,
    download_stats: Arc<LaneStats>,
    metadata_stats: Arc<LaneStats>,
    download_tx: mpsc::UnboundedSender<Entry>,
    livestream_tx: mpsc::UnboundedSender<Entry>,
    metadata_tx: mpsc::UnboundedSender<Entry>,
    receivers: Mutex<Option<Receivers>>,
    epoch: Arc<AtomicU64>,
    drained: Arc<Notify>,
    running: AtomicBool,
}

impl DispatchQueue {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        download_limit: usize,
        metadata_limit: usize,
    ) -> Self {
        let download_limit = download_limit.max(1);
        let metadata_limit = metadata_limit.max(1);
        let (download_tx, download_rx) = mpsc::unbounded_channel();
        let (livestream_tx, livestream_rx) = mpsc::unbounded_channel();
        let (metadata_tx, metadata_rx) = mpsc::unbounded_channel();

        Self {
            downloader,
            download_limit,
            metadata_limit,
            download_semaphore: Arc::new(Semaphore::new(download_limit)),
            metadata_semaphore: Arc::new(Semaphore::new(metadata_limit)),
            download_stats: Arc::new(LaneStats::default()),
            metadata_stats: Arc::new(LaneStats::default()),
            download_tx,
            livestream_tx,
            metadata_tx,
            receivers: Mutex::new(Some(Receivers {
                download: download_rx,
                livestream: livestream_rx,
                metadata: metadata_rx,
            })),
            epoch: Arc::new(AtomicU64::new(0)),
            drained: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Spawn the lane consumers. Entries published earlier are buffered
    /// and dispatched now.
    pub async fn start(&self) {
        let Some(receivers) = self.receivers.lock().await.take() else {
            warn!("Dispatch queue already started");
            return;
        };
        self.running.store(true, Ordering::SeqCst);

        let download = self.lane(LaneKind::Download);
        let metadata = self.lane(LaneKind::Metadata);
        tokio::spawn(download.clone().consume(receivers.livestream, false));
        tokio::spawn(download.consume(receivers.download, true));
        tokio::spawn(metadata.consume(receivers.metadata, true));

        info!(
            "Dispatch queue started (downloads: {}, metadata: {})",
            self.download_limit, self.metadata_limit
        );
    }

    fn lane(&self, kind: LaneKind) -> Lane {
        let (semaphore, stats) = match kind {
            LaneKind::Download => (&self.download_semaphore, &self.download_stats),
            LaneKind::Metadata => (&self.metadata_semaphore, &self.metadata_stats),
        };
        Lane {
            kind,
            semaphore: Arc::clone(semaphore),
            stats: Arc::clone(stats),
            downloader: Arc::clone(&self.downloader),
            epoch: Arc::clone(&self.epoch),
            drained: Arc::clone(&self.drained),
        }
    }

    /// Mark the job Pending and admit it to both lanes.
    pub async fn publish(&self, job: Arc<Job>) -> Result<(), QueueError> {
        job.set_pending().await;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let download_tx = if job.is_livestream() {
            &self.livestream_tx
        } else {
            &self.download_tx
        };
        self.download_stats.queued.fetch_add(1, Ordering::Relaxed);
        if download_tx
            .send(Entry {
                job: Arc::clone(&job),
                epoch,
            })
            .is_err()
        {
            self.download_stats.queued.fetch_sub(1, Ordering::Relaxed);
            return Err(QueueError::Closed);
        }

        self.metadata_stats.queued.fetch_add(1, Ordering::Relaxed);
        if self.metadata_tx.send(Entry { job, epoch }).is_err() {
            self.metadata_stats.queued.fetch_sub(1, Ordering::Relaxed);
            return Err(QueueError::Closed);
        }

        Ok(())
    }

    /// Drop every entry that has not started yet.
    ///
    /// Best effort: an entry already holding a slot is not affected.
    pub fn drain(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.drained.notify_waiters();
        info!("Dispatch queue drained (epoch {})", epoch);
    }

    pub fn download_limit(&self) -> usize {
        self.download_limit
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            running: self.running.load(Ordering::SeqCst),
            download: self
                .download_stats
                .to_status("download", self.download_limit),
            metadata: self
                .metadata_stats
                .to_status("metadata", self.metadata_limit),
        }
    }
}

impl Lane {
    fn is_stale(&self, entry: &Entry) -> bool {
        entry.epoch < self.epoch.load(Ordering::SeqCst)
    }

    fn skip(&self, entry: &Entry, reason: &str) {
        self.stats.queued.fetch_sub(1, Ordering::Relaxed);
        debug!(
            "[{}] {} lane skipped entry: {}",
            entry.job.short_id(),
            self.kind.name(),
            reason
        );
    }

    /// Admit entries in order. With `bounded` unset entries start without
    /// waiting for a slot.
    async fn consume(self, mut rx: mpsc::UnboundedReceiver<Entry>, bounded: bool) {
        while let Some(entry) = rx.recv().await {
            if self.is_stale(&entry) {
                self.skip(&entry, "drained");
                continue;
            }

            let permit = if !bounded {
                None
            } else {
                // Registered before the stale check so a drain between the
                // two still wakes this wait.
                let drained = self.drained.notified();
                tokio::pin!(drained);
                drained.as_mut().enable();
                if self.is_stale(&entry) {
                    self.skip(&entry, "drained");
                    continue;
                }
                tokio::select! {
                    permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                    _ = &mut drained => {
                        self.skip(&entry, "drained while waiting");
                        continue;
                    }
                }
            };

            if matches!(self.kind, LaneKind::Download) && entry.job.status().await.is_terminal() {
                self.skip(&entry, "already finished");
                continue;
            }

            self.stats.queued.fetch_sub(1, Ordering::Relaxed);
            self.stats.active.fetch_add(1, Ordering::Relaxed);

            let lane = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let ok = match lane.kind {
                    LaneKind::Download => run_download(&lane, entry.job).await,
                    LaneKind::Metadata => run_metadata(&lane, entry.job).await,
                };
                lane.stats.active.fetch_sub(1, Ordering::Relaxed);
                if ok {
                    lane.stats.total_processed.fetch_add(1, Ordering::Relaxed);
                } else {
                    lane.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
        debug!("{} lane consumer stopped", self.kind.name());
    }
}

async fn run_download(lane: &Lane, job: Arc<Job>) -> bool {
    metrics::DOWNLOADS_ACTIVE.inc();
    let result = lane.downloader.download(Arc::clone(&job)).await;
    metrics::DOWNLOADS_ACTIVE.dec();

    let status = job.status().await;
    metrics::JOBS_FINISHED
        .with_label_values(&[status.as_str()])
        .inc();

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("[{}] download ended with error: {}", job.short_id(), e);
            false
        }
    }
}

async fn run_metadata(lane: &Lane, job: Arc<Job>) -> bool {
    match lane.downloader.fetch_metadata(job.url()).await {
        Ok(info) => {
            job.set_info(info).await;
            true
        }
        Err(e) => {
            metrics::METADATA_FAILURES.inc();
            warn!("[{}] metadata fetch failed: {}", job.short_id(), e);
            false
        }
    }
}

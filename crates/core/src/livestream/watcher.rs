//! One watcher per upcoming livestream.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::BufReader;
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::downloader::{livestream_probe_args, terminate_group};
use crate::job::Job;
use crate::metrics;
use crate::queue::DispatchQueue;

use super::timespan::{next_token, parse_time_span, Countdown};
use super::types::{LivestreamStatus, WatcherState};

/// Lines inspected for the waiting marker before assuming the stream is live.
const PROBE_LINES: usize = 5;
const WAITING_MARKER: &str = "Waiting for";
const COUNTDOWN_MARKER: &str = "Remaining time until next attempt";

/// Polls the downloader's wait-for-video mode until a stream starts, then
/// hands the stream's job to the dispatch queue.
pub(crate) struct Watcher {
    pub(crate) id: u64,
    pub(crate) url: String,
    job: Arc<Job>,
    status: RwLock<LivestreamStatus>,
    process: Mutex<Option<u32>>,
    killed: AtomicBool,
    live: AtomicBool,
}

impl Watcher {
    pub(crate) fn new(id: u64, url: String, job: Arc<Job>) -> Self {
        let status = LivestreamStatus {
            job_id: job.id().to_string(),
            ..Default::default()
        };
        Self {
            id,
            url,
            job,
            status: RwLock::new(status),
            process: Mutex::new(None),
            killed: AtomicBool::new(false),
            live: AtomicBool::new(false),
        }
    }

    pub(crate) async fn status(&self) -> LivestreamStatus {
        self.status.read().await.clone()
    }

    async fn set_state(&self, state: WatcherState) {
        self.status.write().await.state = state;
    }

    /// Run the probe until the process exits.
    pub(crate) async fn run(&self, program: PathBuf, queue: Arc<DispatchQueue>) {
        let mut command = Command::new(&program);
        command
            .args(livestream_probe_args(&self.url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start livestream probe for {}: {}", self.url, e);
                self.set_state(WatcherState::Errored).await;
                self.job.mark_errored(e.to_string()).await;
                return;
            }
        };

        if let Some(pid) = child.id() {
            *self.process.lock().await = Some(pid);
        }
        info!("Watching livestream {}", self.url);

        if let Some(stdout) = child.stdout.take() {
            self.scan(BufReader::new(stdout), &queue).await;
        }

        if let Err(e) = child.wait().await {
            debug!("Livestream probe for {} did not exit cleanly: {}", self.url, e);
        }
        *self.process.lock().await = None;

        if self.killed.load(Ordering::SeqCst) {
            return;
        }
        // Too little output to decide: treat the stream as live rather
        // than leave it hanging.
        if !self.live.load(Ordering::SeqCst) {
            self.go_live(&queue).await;
        }
    }

    async fn scan<R>(&self, mut reader: R, queue: &DispatchQueue)
    where
        R: tokio::io::AsyncBufRead + Unpin,
    {
        let mut probed = 0;
        let mut waiting = false;

        loop {
            let token = match next_token(&mut reader).await {
                Ok(Some(token)) => token,
                Ok(None) => break,
                Err(e) => {
                    warn!("Livestream probe read failed for {}: {}", self.url, e);
                    break;
                }
            };
            let line = token.trim();
            if line.is_empty() || self.live.load(Ordering::SeqCst) {
                continue;
            }

            if !waiting {
                if line.contains(WAITING_MARKER) {
                    waiting = true;
                    self.set_state(WatcherState::Waiting).await;
                    // `Waiting for 00:27:15 - Press Ctrl+C...` already carries a countdown
                    if let Ok(countdown) = parse_time_span(line) {
                        self.apply_countdown(countdown).await;
                    }
                    continue;
                }
                probed += 1;
                if probed >= PROBE_LINES {
                    self.go_live(queue).await;
                }
                continue;
            }

            if line.contains(COUNTDOWN_MARKER) {
                match parse_time_span(line) {
                    Ok(countdown) => self.apply_countdown(countdown).await,
                    Err(e) => debug!("Skipping countdown line for {}: {}", self.url, e),
                }
            } else if !line.contains(WAITING_MARKER) {
                self.go_live(queue).await;
            }
        }
    }

    async fn apply_countdown(&self, countdown: Countdown) {
        let mut status = self.status.write().await;
        status.state = WatcherState::Waiting;
        status.wait_time_secs = countdown.total_secs();
        status.live_date = countdown.target(Utc::now());
    }

    async fn go_live(&self, queue: &DispatchQueue) {
        if self.killed.load(Ordering::SeqCst) || self.live.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Livestream {} is live, queueing job {}", self.url, self.job.short_id());
        {
            let mut status = self.status.write().await;
            status.state = WatcherState::InProgress;
            status.wait_time_secs = 0;
        }
        metrics::LIVESTREAMS_STARTED.inc();

        if let Err(e) = queue.publish(Arc::clone(&self.job)).await {
            warn!("Failed to queue livestream {}: {}", self.url, e);
            self.set_state(WatcherState::Errored).await;
            self.job.mark_errored(e.to_string()).await;
        }
    }

    /// Stop watching. A stream that never went live leaves its job Completed.
    pub(crate) async fn kill(&self) -> std::io::Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        let pgid = *self.process.lock().await;
        let result = match pgid {
            Some(pgid) => terminate_group(pgid),
            None => Ok(()),
        };

        if !self.live.load(Ordering::SeqCst) {
            self.job.mark_completed().await;
        }
        self.set_state(WatcherState::Completed).await;
        result
    }
}

//! yt-dlp subprocess supervisor.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::config::DownloaderConfig;
use crate::job::{DownloadInfo, Job};

use super::args;
use super::error::DownloaderError;
use super::formats::FormatsInfo;
use super::progress;
use super::signal;
use super::traits::Downloader;

/// Drives the yt-dlp executable.
pub struct YtDlpDownloader {
    config: DownloaderConfig,
}

impl YtDlpDownloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DownloaderConfig::default())
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.config.metadata_timeout_secs)
    }

    /// Run to completion and return stdout. With a deadline the child is
    /// killed once it passes.
    async fn run_capture(
        &self,
        args: &[String],
        deadline: Option<Duration>,
    ) -> Result<String, DownloaderError> {
        let child = Command::new(&self.config.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloaderError::spawn(&self.config.path, e))?;

        let output = match deadline {
            Some(deadline) => timeout(deadline, child.wait_with_output())
                .await
                .map_err(|_| DownloaderError::Timeout {
                    timeout_secs: deadline.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            return Err(DownloaderError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Ask the downloader which file a job produced.
    async fn resolve_filename(&self, job: &Job) -> Result<String, DownloaderError> {
        let output = job.output().await;
        let args = args::filename_args(job.url(), job.params(), &output);
        let stdout = self.run_capture(&args, Some(self.deadline())).await?;
        stdout
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DownloaderError::decode("empty filename output"))
    }

    /// Read stdout to EOF, applying every recognised line to the job.
    async fn consume_stdout(job: &Job, stdout: tokio::process::ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    progress::apply_line(job, &line).await;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("[{}] stdout read failed: {}", job.short_id(), e);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn download(&self, job: Arc<Job>) -> Result<(), DownloaderError> {
        // Killed or cleared between admission and spawn
        if job.status().await.is_terminal() {
            debug!("[{}] finished before spawn, skipping", job.short_id());
            return Ok(());
        }

        let output = job.output().await;
        let args = args::download_args(job.url(), job.params(), &output);

        let mut command = Command::new(&self.config.path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = DownloaderError::spawn(&self.config.path, e);
                warn!("[{}] failed to spawn downloader: {}", job.short_id(), err);
                job.mark_errored(err.to_string()).await;
                return Err(err);
            }
        };

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill().await;
            let err = DownloaderError::StreamUnavailable;
            job.mark_errored(err.to_string()).await;
            return Err(err);
        };

        if let Some(pid) = child.id() {
            job.attach_process(pid).await;
        }
        info!("[{}] downloading {}", job.short_id(), job.url());
        debug!("[{}] args: {:?}", job.short_id(), args);

        let stderr_task = child.stderr.take().map(|stderr| {
            let short_id = job.short_id().to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[{}] {}", short_id, line);
                }
            })
        });

        Self::consume_stdout(&job, stdout).await;

        let status = child.wait().await;
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        job.detach_process().await;
        job.mark_completed().await;

        if job.saved_file_path().await.is_none() {
            match self.resolve_filename(&job).await {
                Ok(path) => job.set_saved_path(path).await,
                Err(e) => debug!("[{}] could not resolve filename: {}", job.short_id(), e),
            }
        }

        let status = status?;
        info!("[{}] finished with {}", job.short_id(), status);
        if status.success() {
            Ok(())
        } else {
            Err(DownloaderError::ExitStatus {
                code: status.code(),
                stderr: String::new(),
            })
        }
    }

    async fn kill(&self, job: &Job) -> Result<(), DownloaderError> {
        let pgid = job
            .live_process()
            .await
            .ok_or_else(|| DownloaderError::no_live_process(job.id()))?;

        signal::terminate_group(pgid).map_err(|e| DownloaderError::Signal {
            pgid,
            reason: e.to_string(),
        })?;

        job.detach_process().await;
        job.mark_completed().await;
        info!("[{}] killed process group {}", job.short_id(), pgid);
        Ok(())
    }

    async fn fetch_metadata(&self, url: &str) -> Result<DownloadInfo, DownloaderError> {
        let stdout = self
            .run_capture(&args::metadata_args(url), Some(self.deadline()))
            .await?;
        serde_json::from_str(&stdout)
            .map_err(|e| DownloaderError::decode(format!("metadata: {}", e)))
    }

    async fn fetch_formats(&self, url: &str) -> Result<FormatsInfo, DownloaderError> {
        let stdout = self
            .run_capture(&args::metadata_args(url), Some(self.deadline()))
            .await?;
        FormatsInfo::from_dump(&stdout)
    }

    async fn fetch_playlist(&self, url: &str) -> Result<String, DownloaderError> {
        self.run_capture(&args::playlist_args(url), Some(self.deadline()))
            .await
    }

    async fn version(&self) -> Result<String, DownloaderError> {
        let stdout = self
            .run_capture(&["--version".to_string()], Some(self.deadline()))
            .await?;
        Ok(stdout.trim().to_string())
    }

    async fn update(&self) -> Result<String, DownloaderError> {
        let stdout = self.run_capture(&["-U".to_string()], None).await?;
        Ok(stdout.trim().to_string())
    }
}

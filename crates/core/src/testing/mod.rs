//! Testing utilities and mock implementations.
//!
//! `MockDownloader` replaces the external executable entirely and measures
//! concurrency. `FakeYtDlp` writes a shell script that behaves like the
//! executable closely enough to drive the real subprocess supervisor.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediaq_core::testing::{fixtures, MockDownloader};
//!
//! let downloader = MockDownloader::new();
//! downloader.hold_downloads().await;
//!
//! let service = JobService::new(&fixtures::config(dir.path(), 1), Arc::new(downloader.clone()));
//! service.start().await;
//! let id = service.submit(fixtures::request("https://example.com/v1")).await?;
//! ```

mod fake_ytdlp;
mod mock_downloader;

pub use fake_ytdlp::FakeYtDlp;
pub use mock_downloader::MockDownloader;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::time::Duration;

    use chrono::Utc;

    use crate::config::Config;
    use crate::job::{DownloadInfo, DownloadRequest, JobStatus};
    use crate::registry::JobRegistry;

    /// A plain submission for `url`.
    pub fn request(url: &str) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            path: None,
            rename: None,
            params: Vec::new(),
        }
    }

    /// Metadata as the downloader would report it.
    pub fn info(url: &str, title: &str) -> DownloadInfo {
        let mut info = DownloadInfo::placeholder(url, Utc::now());
        info.title = title.to_string();
        info.ext = Some("mp4".to_string());
        info.resolution = Some("1920x1080".to_string());
        info
    }

    /// A flattened playlist listing for `urls`.
    pub fn playlist_json(urls: &[&str]) -> String {
        let entries: Vec<serde_json::Value> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                serde_json::json!({
                    "_type": "url",
                    "url": url,
                    "title": format!("Entry {}", i + 1),
                })
            })
            .collect();
        serde_json::json!({
            "_type": "playlist",
            "title": "Test playlist",
            "entries": entries,
        })
        .to_string()
    }

    /// Config rooted in `dir` with a fixed download lane ceiling.
    pub fn config(dir: &Path, queue_size: usize) -> Config {
        let mut config = Config::default();
        config.downloader.download_path = dir.join("downloads");
        config.persistence.dir = dir.to_path_buf();
        config.queue.size = queue_size;
        config
    }

    /// Poll until the job reaches `status` or `timeout` passes.
    pub async fn wait_for_status(
        registry: &JobRegistry,
        id: &str,
        status: JobStatus,
        timeout: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if let Ok(job) = registry.get(id).await {
                if job.status().await == status {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

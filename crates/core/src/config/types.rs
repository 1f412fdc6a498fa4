use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3033
}

/// External downloader executable configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Path or name of the yt-dlp executable.
    #[serde(default = "default_downloader_path")]
    pub path: PathBuf,
    /// Directory downloads are saved to unless a request overrides it.
    #[serde(default = "default_download_path")]
    pub download_path: PathBuf,
    /// Deadline for metadata, format, filename and version queries.
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            path: default_downloader_path(),
            download_path: default_download_path(),
            metadata_timeout_secs: default_metadata_timeout(),
        }
    }
}

fn default_downloader_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_download_path() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_metadata_timeout() -> u64 {
    10
}

/// Dispatch queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Download lane ceiling. 0 picks a value from the host's core count.
    #[serde(default)]
    pub size: usize,
    #[serde(default = "default_metadata_concurrency")]
    pub metadata_concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            size: 0,
            metadata_concurrency: default_metadata_concurrency(),
        }
    }
}

fn default_metadata_concurrency() -> usize {
    1
}

impl QueueConfig {
    /// Effective download lane ceiling.
    ///
    /// An explicit size wins. Otherwise the logical core count is used,
    /// except on machines with two cores or fewer where downloads run
    /// one at a time.
    pub fn download_concurrency(&self) -> usize {
        if self.size > 0 {
            return self.size;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        if cores <= 2 {
            1
        } else {
            cores
        }
    }
}

/// Snapshot persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_session_file")]
    pub session_file: String,
    #[serde(default = "default_livestream_file")]
    pub livestream_file: String,
    #[serde(default = "default_persist_interval")]
    pub interval_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            dir: default_persistence_dir(),
            session_file: default_session_file(),
            livestream_file: default_livestream_file(),
            interval_secs: default_persist_interval(),
        }
    }
}

fn default_persistence_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_session_file() -> String {
    "session.dat".to_string()
}

fn default_livestream_file() -> String {
    "livestreams.dat".to_string()
}

fn default_persist_interval() -> u64 {
    300
}

impl PersistenceConfig {
    pub fn session_path(&self) -> PathBuf {
        self.dir.join(&self.session_file)
    }

    pub fn livestream_path(&self) -> PathBuf {
        self.dir.join(&self.livestream_file)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Config as reported over the API
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub downloader: SanitizedDownloaderConfig,
    pub queue: SanitizedQueueConfig,
    pub persistence_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloaderConfig {
    pub path: String,
    pub download_path: String,
    pub metadata_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQueueConfig {
    pub download_concurrency: usize,
    pub metadata_concurrency: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            downloader: SanitizedDownloaderConfig {
                path: config.downloader.path.display().to_string(),
                download_path: config.downloader.download_path.display().to_string(),
                metadata_timeout_secs: config.downloader.metadata_timeout_secs,
            },
            queue: SanitizedQueueConfig {
                download_concurrency: config.queue.download_concurrency(),
                metadata_concurrency: config.queue.metadata_concurrency,
            },
            persistence_interval_secs: config.persistence.interval_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3033);
        assert_eq!(config.downloader.path, PathBuf::from("yt-dlp"));
        assert_eq!(config.downloader.metadata_timeout_secs, 10);
        assert_eq!(config.queue.metadata_concurrency, 1);
        assert_eq!(config.persistence.interval_secs, 300);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_explicit_queue_size_wins() {
        let queue = QueueConfig {
            size: 3,
            metadata_concurrency: 1,
        };
        assert_eq!(queue.download_concurrency(), 3);
    }

    #[test]
    fn test_auto_queue_size_is_positive() {
        let queue = QueueConfig::default();
        assert!(queue.download_concurrency() >= 1);
    }

    #[test]
    fn test_persistence_paths() {
        let persistence = PersistenceConfig {
            dir: PathBuf::from("/var/lib/mediaq"),
            ..Default::default()
        };
        assert_eq!(
            persistence.session_path(),
            PathBuf::from("/var/lib/mediaq/session.dat")
        );
        assert_eq!(
            persistence.livestream_path(),
            PathBuf::from("/var/lib/mediaq/livestreams.dat")
        );
    }

    #[test]
    fn test_sanitized_config_reports_effective_concurrency() {
        let mut config = Config::default();
        config.queue.size = 4;
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.queue.download_concurrency, 4);
        assert_eq!(sanitized.downloader.path, "yt-dlp");
    }
}

pub mod config;
pub mod downloader;
pub mod job;
pub mod livestream;
pub mod metrics;
pub mod persistence;
pub mod playlist;
pub mod queue;
pub mod registry;
pub mod service;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    SanitizedConfig,
};
pub use downloader::{Downloader, DownloaderError, Format, FormatsInfo, YtDlpDownloader};
pub use job::{
    DownloadInfo, DownloadOutput, DownloadProgress, DownloadRequest, Job, JobSpec, JobStatus,
    JobSummary,
};
pub use livestream::{LivestreamError, LivestreamMonitor, LivestreamStatus, WatcherState};
pub use persistence::PersistenceError;
pub use playlist::PlaylistError;
pub use queue::{DispatchQueue, LaneStatus, QueueError, QueueStatus};
pub use registry::{JobRegistry, RegistryError, RestoreReport};
pub use service::{JobService, ServiceError, StartupRestore};

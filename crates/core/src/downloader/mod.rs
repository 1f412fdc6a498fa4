//! External downloader integration.
//!
//! Each download runs the executable as its own process group, reads its
//! stdout line by line and writes parsed progress into the job. Metadata,
//! format, filename and version queries are short bounded calls.

mod args;
mod error;
mod formats;
mod progress;
mod signal;
mod traits;
mod ytdlp;

pub use args::{
    download_args, livestream_probe_args, sanitize_params, strip_playlist_selector,
    DOWNLOAD_TEMPLATE, LIVESTREAM_PARAMS, POSTPROCESS_TEMPLATE,
};
pub use error::DownloaderError;
pub use formats::{Format, FormatsInfo};
pub use progress::{parse_line, ProgressLine};
pub use signal::terminate_group;
pub use traits::Downloader;
pub use ytdlp::YtDlpDownloader;

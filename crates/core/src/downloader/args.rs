//! Argument vectors for each downloader mode.

use std::path::Path;

use crate::job::DownloadOutput;

/// Download progress, one JSON object per tick.
pub const DOWNLOAD_TEMPLATE: &str = r#"download:{"eta":%(progress.eta)s,"percentage":"%(progress._percent_str)s","speed":%(progress.speed)s}"#;

/// Post-processing progress, reporting the final file path.
pub const POSTPROCESS_TEMPLATE: &str = r#"postprocess:{"filepath":"%(info.filepath)s"}"#;

/// Arguments forced onto every livestream download.
pub const LIVESTREAM_PARAMS: [&str; 3] = ["--downloader", "ffmpeg", "--no-part"];

/// Seconds between livestream availability checks.
pub const LIVESTREAM_RECHECK_SECS: u32 = 10;

const OUTPUT_FLAGS: [&str; 4] = ["-o", "--output", "-P", "--paths"];

/// Whether a caller argument could smuggle shell syntax.
fn is_unsafe(param: &str) -> bool {
    param.contains("${") || param.contains("&&")
}

/// Drop empty and unsafe caller arguments.
pub fn sanitize_params(params: &[String]) -> Vec<String> {
    params
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty() && !is_unsafe(p))
        .map(str::to_string)
        .collect()
}

/// Cut a playlist selector off a single-item URL.
pub fn strip_playlist_selector(url: &str) -> &str {
    ["?list=", "&list="]
        .iter()
        .filter_map(|marker| url.find(marker))
        .min()
        .map_or(url, |idx| &url[..idx])
}

/// Whether the caller already chose where output goes.
pub fn has_output_flag(params: &[String]) -> bool {
    params.iter().any(|p| {
        OUTPUT_FLAGS.iter().any(|&flag| {
            p.as_str() == flag
                || (flag.starts_with("--") && p.starts_with(&format!("{}=", flag)))
        })
    })
}

/// Full output template: directory joined with the filename template.
pub fn output_template(output: &DownloadOutput) -> String {
    Path::new(&output.path)
        .join(&output.filename)
        .to_string_lossy()
        .to_string()
}

/// Arguments for a download run.
pub fn download_args(url: &str, params: &[String], output: &DownloadOutput) -> Vec<String> {
    let params = sanitize_params(params);

    let mut args = vec![
        strip_playlist_selector(url).to_string(),
        "--newline".to_string(),
        "--no-colors".to_string(),
        "--no-playlist".to_string(),
        "--progress-template".to_string(),
        DOWNLOAD_TEMPLATE.to_string(),
        "--progress-template".to_string(),
        POSTPROCESS_TEMPLATE.to_string(),
    ];

    if !has_output_flag(&params) {
        args.extend(["-o".to_string(), output_template(output)]);
    }

    args.extend(params);
    args
}

/// Arguments resolving the filename a download produces.
pub fn filename_args(url: &str, params: &[String], output: &DownloadOutput) -> Vec<String> {
    let params = sanitize_params(params);

    let mut args = vec![
        strip_playlist_selector(url).to_string(),
        "--no-playlist".to_string(),
        "--print".to_string(),
        "filename".to_string(),
    ];

    if !has_output_flag(&params) {
        args.extend(["-o".to_string(), output_template(output)]);
    }

    args.extend(params);
    args
}

/// Arguments dumping one item's metadata as JSON.
pub fn metadata_args(url: &str) -> Vec<String> {
    vec![
        strip_playlist_selector(url).to_string(),
        "-J".to_string(),
        "--no-playlist".to_string(),
    ]
}

/// Arguments dumping a flattened collection listing.
pub fn playlist_args(url: &str) -> Vec<String> {
    vec![
        url.to_string(),
        "-J".to_string(),
        "--flat-playlist".to_string(),
    ]
}

/// Arguments probing an upcoming livestream.
pub fn livestream_probe_args(url: &str) -> Vec<String> {
    vec![
        url.to_string(),
        "--wait-for-video".to_string(),
        LIVESTREAM_RECHECK_SECS.to_string(),
        "--simulate".to_string(),
        "--no-colors".to_string(),
        "--newline".to_string(),
    ]
}

//! Parsing of the downloader's templated progress lines.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;

use crate::job::Job;

/// One structured line from the downloader's stdout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProgressLine {
    Download {
        percentage: String,
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        eta: Option<f64>,
    },
    Postprocess {
        filepath: String,
    },
}

/// A bare `NA` in value position, right after a key.
static BARE_NA: Lazy<Regex> = Lazy::new(|| Regex::new(r#"("\w+"\s*):\s*NA\b"#).unwrap());

/// Parse a stdout line. Anything that is not one of the two templates
/// yields `None`.
///
/// The downloader prints `NA` for unknown numeric fields, which is not
/// JSON, so it is read as null. Text inside string values is left alone.
pub fn parse_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    let normalized = BARE_NA.replace_all(line, "${1}:null");
    serde_json::from_str(&normalized).ok()
}

/// Apply one stdout line to the job. Returns whether it was understood.
pub async fn apply_line(job: &Job, line: &str) -> bool {
    match parse_line(line) {
        Some(ProgressLine::Download {
            percentage,
            speed,
            eta,
        }) => {
            job.apply_progress(&percentage, speed.unwrap_or(0.0), eta.unwrap_or(0.0))
                .await;
            true
        }
        Some(ProgressLine::Postprocess { filepath }) if !filepath.is_empty() && filepath != "NA" => {
            job.set_saved_path(filepath).await;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_download_tick() {
        let line = r#"{"eta":12,"percentage":"  4.5%","speed":2048.5}"#;
        assert_eq!(
            parse_line(line),
            Some(ProgressLine::Download {
                percentage: "  4.5%".to_string(),
                speed: Some(2048.5),
                eta: Some(12.0),
            })
        );
    }

    #[test]
    fn test_parse_unknown_numbers() {
        let line = r#"{"eta":NA,"percentage":"Unknown %","speed":NA}"#;
        assert_eq!(
            parse_line(line),
            Some(ProgressLine::Download {
                percentage: "Unknown %".to_string(),
                speed: None,
                eta: None,
            })
        );
    }

    #[test]
    fn test_parse_postprocess() {
        let line = r#"{"filepath":"/downloads/Some Video.mp4"}"#;
        assert_eq!(
            parse_line(line),
            Some(ProgressLine::Postprocess {
                filepath: "/downloads/Some Video.mp4".to_string()
            })
        );
    }

    #[test]
    fn test_na_inside_string_values_is_kept() {
        let line = r#"{"filepath":"/downloads/Title:NASA launch.mp4"}"#;
        assert_eq!(
            parse_line(line),
            Some(ProgressLine::Postprocess {
                filepath: "/downloads/Title:NASA launch.mp4".to_string()
            })
        );

        let line = r#"{"filepath":"/downloads/a:NA,b:NA}.mp4"}"#;
        assert_eq!(
            parse_line(line),
            Some(ProgressLine::Postprocess {
                filepath: "/downloads/a:NA,b:NA}.mp4".to_string()
            })
        );
    }

    #[test]
    fn test_adjacent_unknown_numbers() {
        let line = r#"{"percentage":"0.0%","eta":NA,"speed":NA}"#;
        assert_eq!(
            parse_line(line),
            Some(ProgressLine::Download {
                percentage: "0.0%".to_string(),
                speed: None,
                eta: None,
            })
        );
    }

    #[test]
    fn test_noise_is_ignored() {
        assert_eq!(parse_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line(r#"{"eta":1,"percen"#), None);
        assert_eq!(parse_line(r#"{"unrelated":true}"#), None);
    }
}

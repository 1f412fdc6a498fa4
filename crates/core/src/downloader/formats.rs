//! Format listings for format-selection UIs.

use serde::{Deserialize, Serialize};

use super::error::DownloaderError;

/// One downloadable variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    #[serde(default)]
    pub tbr: Option<f64>,
}

/// Available variants plus the one the downloader would pick by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatsInfo {
    pub best: Format,
    pub formats: Vec<Format>,
}

impl FormatsInfo {
    /// Decode a single-item JSON dump.
    ///
    /// The top-level document describes the selected format, so it doubles
    /// as `best`.
    pub fn from_dump(json: &str) -> Result<Self, DownloaderError> {
        #[derive(Deserialize)]
        struct Dump {
            #[serde(flatten)]
            best: Format,
            #[serde(default)]
            formats: Vec<Format>,
        }

        let dump: Dump = serde_json::from_str(json)
            .map_err(|e| DownloaderError::decode(format!("format listing: {}", e)))?;

        Ok(Self {
            best: dump.best,
            formats: dump.formats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dump() {
        let json = r#"{
            "title": "clip",
            "format_id": "137+140",
            "ext": "mp4",
            "resolution": "1920x1080",
            "vcodec": "avc1.640028",
            "acodec": "mp4a.40.2",
            "formats": [
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "filesize": 3500000},
                {"format_id": "137", "ext": "mp4", "resolution": "1920x1080", "vcodec": "avc1.640028", "acodec": "none"}
            ]
        }"#;

        let info = FormatsInfo::from_dump(json).unwrap();
        assert_eq!(info.best.format_id, "137+140");
        assert_eq!(info.best.resolution.as_deref(), Some("1920x1080"));
        assert_eq!(info.formats.len(), 2);
        assert_eq!(info.formats[0].filesize, Some(3500000.0));
    }

    #[test]
    fn test_from_dump_rejects_non_json() {
        let err = FormatsInfo::from_dump("ERROR: Unsupported URL").unwrap_err();
        assert!(matches!(err, DownloaderError::Decode { .. }));
    }
}

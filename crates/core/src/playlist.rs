//! Fan-out of multi-item sources into individual jobs.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::downloader::{Downloader, DownloaderError};
use crate::job::DownloadRequest;

#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The downloader did not describe anything it can fetch.
    #[error("{url} is probably not a valid source: {reason}")]
    NotAValidSource { url: String, reason: String },

    #[error(transparent)]
    Downloader(#[from] DownloaderError),
}

/// Flattened listing as dumped by the downloader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistDocument {
    #[serde(rename = "_type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl PlaylistEntry {
    /// URL to download this entry from.
    pub fn resolved_url(&self) -> Option<&str> {
        [&self.original_url, &self.url, &self.webpage_url]
            .into_iter()
            .flatten()
            .map(|u| u.trim())
            .find(|u| !u.is_empty())
    }
}

/// One job to create from a playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEntry {
    pub request: DownloadRequest,
    pub title: Option<String>,
    /// Listing position, encoded as a creation time.
    pub created_at: DateTime<Utc>,
}

/// What a source turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistPlan {
    /// One item; submit the original request as is.
    Single,
    /// One entry per distinct URL, in playlist order.
    Entries(Vec<PlannedEntry>),
}

/// Classify a flattened listing and derive per-entry requests.
pub fn plan(
    request: &DownloadRequest,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<PlaylistPlan, PlaylistError> {
    let invalid = |reason: String| PlaylistError::NotAValidSource {
        url: request.url.clone(),
        reason,
    };

    let doc: PlaylistDocument =
        serde_json::from_str(raw).map_err(|e| invalid(format!("unreadable listing ({})", e)))?;

    match doc.kind.as_deref().map(str::trim) {
        None | Some("") => Err(invalid("listing has no type".to_string())),
        Some("playlist") | Some("multi_video") => {
            let mut seen = HashSet::new();
            let mut requests = Vec::new();

            for entry in &doc.entries {
                let Some(url) = entry.resolved_url() else {
                    continue;
                };
                if !seen.insert(url.to_string()) {
                    continue;
                }

                let rename = request.rename.as_ref().map(|rename| {
                    let title = entry.title.as_deref().unwrap_or_default();
                    rename.replace("%(title)s", title)
                });

                let created_at = now + Duration::milliseconds(requests.len() as i64 + 1);
                requests.push(PlannedEntry {
                    request: DownloadRequest {
                        url: url.to_string(),
                        path: request.path.clone(),
                        rename,
                        params: request.params.clone(),
                    },
                    title: entry.title.clone(),
                    created_at,
                });
            }

            if requests.is_empty() {
                return Err(invalid("playlist has no entries".to_string()));
            }
            Ok(PlaylistPlan::Entries(requests))
        }
        Some(_) => Ok(PlaylistPlan::Single),
    }
}

/// Query the downloader for `request.url` and plan its expansion.
pub async fn inspect(
    downloader: &dyn Downloader,
    request: &DownloadRequest,
) -> Result<PlaylistPlan, PlaylistError> {
    let raw = downloader.fetch_playlist(&request.url).await?;
    plan(request, &raw, Utc::now())
}

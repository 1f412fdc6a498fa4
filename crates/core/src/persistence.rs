//! Snapshot file I/O shared by the job registry and the livestream monitor.

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while writing or reading a snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Snapshot I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl PersistenceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, PersistenceError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PersistenceError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Replace `path` with `bytes`.
///
/// The data lands in a sibling temp file first and is renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
pub(crate) async fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PersistenceError::io(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| PersistenceError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| PersistenceError::io(path, e))?;
    Ok(())
}

/// Read a snapshot. A missing file is not an error.
pub(crate) async fn read_snapshot(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersistenceError::io(path, e)),
    }
}

//! Data files referenced by the database (BAMs, FASTQs)

use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;

use crate::error::{Error, Result};

/// Size and modification time of a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    /// RFC 3339 modification time
    pub created: String,
    /// Modification time as seconds since the Unix epoch
    pub epoch: i64,
}

/// Stat a file; `None` if it does not exist or is not a regular file
pub async fn stat(path: &Path) -> Option<FileStat> {
    let metadata = fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    let modified: DateTime<Utc> = metadata.modified().ok()?.into();
    Some(FileStat {
        size: metadata.len(),
        created: modified.to_rfc3339(),
        epoch: modified.timestamp(),
    })
}

/// Delete a file. Returns `false` if it was already gone.
pub async fn remove(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::info!("Deleted {:?}", path);
            Ok(true)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{:?} already absent from disk", path);
            Ok(false)
        }
        Err(source) => Err(Error::FileDeleteError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

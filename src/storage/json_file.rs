//! The database file on disk
//!
//! Writes never touch the target in place: the new content goes to a temp
//! file in the same directory which is then renamed over the target, so a
//! reader sees either the old or the new document and never a partial one.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{Error, Result};

/// Read and parse the database file
pub async fn read(path: &Path) -> Result<Value> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::DatabaseNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(Error::FileReadError {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|err| Error::JsonParseError {
        message: format!("{}: {}", path.display(), err),
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Serialize `value` and atomically replace `path` with it
pub async fn write(path: &Path, value: &Value, pretty: bool) -> Result<()> {
    let mut bytes = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(|err| Error::JsonSerializeError {
        message: err.to_string(),
    })?;
    bytes.push(b'\n');

    let write_error = |source| Error::FileWriteError {
        path: path.to_path_buf(),
        source,
    };

    // Dropping the TempPath on any early return removes the temp file
    let temp = tempfile::Builder::new()
        .prefix(".sampledb-")
        .suffix(".json.tmp")
        .tempfile_in(parent_dir(path))
        .map_err(write_error)?
        .into_temp_path();

    fs::write(&temp, &bytes).await.map_err(write_error)?;
    temp.persist(path).map_err(|err| write_error(err.error))?;

    tracing::debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("samples.json");
        let value = json!({"samples": {"S1": {"sample_meta": {}, "seq": {}}}});

        write(&path, &value, true).await.unwrap();
        assert_eq!(read(&path).await.unwrap(), value);

        write(&path, &json!({"samples": {}}), false).await.unwrap();
        assert_eq!(read(&path).await.unwrap(), json!({"samples": {}}));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("samples.json");
        write(&path, &json!({}), true).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = read(&tmp.path().join("absent.json")).await;
        assert!(matches!(result, Err(Error::DatabaseNotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{\"samples\": ").unwrap();
        assert!(matches!(read(&path).await, Err(Error::JsonParseError { .. })));
    }
}

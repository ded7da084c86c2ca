//! FASTQ discovery for directory imports

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use sampledb_core::fastq_name::is_fastq_file;

use crate::error::{Error, Result};

/// List the FASTQ files directly inside `dir`, sorted by path
pub fn find_fastqs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FileReadError {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map(is_fastq_file).unwrap_or(false))
        .map(|e| e.into_path())
        .collect();

    found.sort();
    Ok(found)
}

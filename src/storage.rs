//! Visit record storage.
//!
//! One JSON document per (domain, mode) pair, written once and never
//! updated. Loading produces an explicit [`VisitSet`] plus a list of typed
//! load failures; unreadable or malformed files are reported, not silently
//! skipped.

use std::path::{Path, PathBuf};

use crate::error_handling::StorageError;
use crate::models::{CrawlMode, VisitRecord, VisitSet};

/// A visit file that could not be loaded, and why.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: StorageError,
}

/// Writes one visit record into `dir` as `<domain>_<mode>.json`.
pub fn write_visit(
    dir: &Path,
    mode: CrawlMode,
    record: &VisitRecord,
) -> Result<PathBuf, StorageError> {
    std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(VisitRecord::filename(&record.domain, mode));
    let json = serde_json::to_string(record).map_err(|source| StorageError::Json {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|source| StorageError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Loads every visit record of both crawl modes from `dir`.
///
/// Files are matched by their `_accept.json` / `_noop.json` suffix; anything
/// else in the directory is ignored. Per-file failures do not abort the
/// load.
///
/// # Errors
///
/// Returns an error only when the directory itself cannot be read.
pub fn load_visits(dir: &Path) -> Result<(VisitSet, Vec<LoadFailure>), StorageError> {
    let entries = std::fs::read_dir(dir).map_err(|source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut visits = VisitSet::default();
    let mut failures = Vec::new();
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    // Directory iteration order is platform-dependent; sort for
    // reproducible aggregation.
    paths.sort();

    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let mode = if name.ends_with("_accept.json") {
            CrawlMode::Accept
        } else if name.ends_with("_noop.json") {
            CrawlMode::Noop
        } else {
            continue;
        };

        match read_record(&path) {
            Ok(record) => visits.push(mode, record),
            Err(error) => {
                log::warn!("Failed to load visit record {}: {error}", path.display());
                failures.push(LoadFailure { path, error });
            }
        }
    }

    Ok((visits, failures))
}

fn read_record(path: &Path) -> Result<VisitRecord, StorageError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

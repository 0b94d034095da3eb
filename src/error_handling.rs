use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for the tracker catalog loader.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The definition file could not be read.
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The definition file is not valid JSON.
    #[error("Failed to parse catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The definition file parses but carries no `categories` object.
    #[error("Catalog file {path} has no categories")]
    Empty { path: PathBuf },
}

/// Error types for per-request classification.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The registrable domain of a URL could not be determined.
    #[error("Failed to extract registrable domain from {url}: {reason}")]
    Domain { url: String, reason: String },
}

/// Error types for visit-record storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A record or the record directory could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized or deserialized.
    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Types of failures that can occur while visiting domains.
///
/// This enum categorizes the failure modes of the crawl pipeline for
/// tracking and end-of-run reporting. Each variant is a specific failure
/// mode; counts are kept in [`CrawlStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    DnsError,
    ConnectTimeout,
    PageLoadError,
    VisitTimeout,
    ConsentClickError,
    MalformedRequestUrl,
    RecordWriteError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::DnsError => "DNS resolution error",
            ErrorType::ConnectTimeout => "Connection timeout",
            ErrorType::PageLoadError => "Page load error",
            ErrorType::VisitTimeout => "Visit timeout",
            ErrorType::ConsentClickError => "Consent click error",
            ErrorType::MalformedRequestUrl => "Malformed request URL",
            ErrorType::RecordWriteError => "Record write error",
        }
    }
}

/// Thread-safe crawl failure statistics.
///
/// Tracks the count of each [`ErrorType`] using atomic counters, allowing
/// concurrent access from multiple visit tasks. All error types are
/// initialized to zero on creation. Share across tasks with `Arc`.
pub struct CrawlStats {
    errors: HashMap<ErrorType, AtomicUsize>,
}

impl CrawlStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }
        CrawlStats { errors }
    }

    pub fn increment(&self, error: ErrorType) {
        // All ErrorType variants are initialized in new(), so unwrap() is safe
        self.errors
            .get(&error)
            .unwrap()
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, error: ErrorType, count: usize) {
        self.errors
            .get(&error)
            .unwrap()
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_count(&self, error: ErrorType) -> usize {
        self.errors.get(&error).unwrap().load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        ErrorType::iter().map(|e| self.get_count(e)).sum()
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs a per-error-type breakdown of the crawl at info level.
pub fn print_error_statistics(stats: &CrawlStats) {
    let total = stats.total();
    if total == 0 {
        return;
    }
    log::info!("Error Counts ({} total):", total);
    for error_type in ErrorType::iter() {
        let count = stats.get_count(error_type);
        if count > 0 {
            log::info!("   {}: {}", error_type.as_str(), count);
        }
    }
}

//! Main application modules.
//!
//! Utilities for domain-argument normalization, progress logging, and
//! shutdown handling used by the crawl loop.

pub mod logging;
pub mod shutdown;
pub mod url;

// Re-export public API
pub use logging::log_progress;
pub use shutdown::shutdown_gracefully;
pub use url::normalize_domain_arg;

//! Shared resource initialization for the crawl.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use reqwest::redirect::Policy;
use reqwest::ClientBuilder;
use tldextract::{TldExtractor, TldOption};
use tokio::sync::Semaphore;

/// Initializes the logger with the given level filter.
pub fn init_logger(level: log::LevelFilter) -> Result<()> {
    env_logger::Builder::new()
        .filter_level(level)
        .try_init()
        .context("Failed to initialize logger")
}

pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}

/// Builds the HTTP client used by page sessions.
///
/// Automatic redirects are disabled: the driver follows the chain manually
/// so every hop is captured as its own exchange.
pub fn init_client(timeout_seconds: u64, user_agent: &str) -> Result<Arc<reqwest::Client>> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(user_agent)
        .redirect(Policy::none())
        .build()
        .context("Failed to initialize HTTP client")?;
    Ok(Arc::new(client))
}

pub fn init_extractor() -> TldExtractor {
    TldExtractor::new(TldOption::default())
}

/// Initializes the DNS resolver from system configuration, falling back to
/// Google's public resolvers when no system configuration is readable.
pub fn init_resolver() -> Arc<TokioAsyncResolver> {
    let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
        log::warn!("Failed to read system resolver config ({e}), using defaults");
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
    });
    Arc::new(resolver)
}

//! consent_crawl library: consent-mode crawl and tracker analysis
//!
//! This library visits websites in two crawl modes — `accept` (a consent
//! banner is located and clicked) and `noop` (no interaction) — records the
//! HTTP traffic, cookies, and redirect chains of each visit as one JSON
//! document per (domain, mode) pair, classifies observed domains against a
//! tracker catalog, and aggregates the records into comparative reports.
//!
//! # Example
//!
//! ```no_run
//! use consent_crawl::{run_crawl, Command, Config};
//! use clap::Parser;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::parse_from(["consent_crawl", "crawl", "-i", "domains.csv", "--accept"]);
//! if let Command::Crawl(args) = config.command {
//!     let report = run_crawl(args).await?;
//!     println!(
//!         "Visited {} domains: {} succeeded, {} failed",
//!         report.total, report.successful, report.failed
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! The crawl requires a Tokio runtime; reporting is synchronous.

#![warn(missing_docs)]

mod app;
mod catalog;
mod classify;
pub mod config;
mod consent;
mod domain;
mod driver;
mod error_handling;
pub mod initialization;
mod models;
mod ranking;
pub mod report;
mod session;
mod storage;
mod visit;

// Re-export public API
pub use catalog::{TrackerCatalog, TrackerEntity};
pub use config::{Command, Config, CrawlArgs, LogLevel, ReportArgs};
pub use models::{Cookie, CrawlMode, RedirectPair, VisitErrors, VisitRecord, VisitSet};
pub use ranking::{load_ranked_domains, RankedDomain};
pub use report::run_report;
pub use run::{run_crawl, CrawlReport};
pub use storage::{load_visits, write_visit, LoadFailure};

// Internal run module (contains the main crawl loop)
mod run {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::{info, warn};
    use tokio_util::sync::CancellationToken;

    use crate::app::{log_progress, normalize_domain_arg, shutdown_gracefully};
    use crate::catalog::TrackerCatalog;
    use crate::config::{CrawlArgs, LOGGING_INTERVAL_SECS, VISIT_TIMEOUT};
    use crate::consent::AcceptWords;
    use crate::driver::HttpDriver;
    use crate::error_handling::{print_error_statistics, CrawlStats, ErrorType};
    use crate::initialization::{init_client, init_extractor, init_resolver, init_semaphore};
    use crate::models::CrawlMode;
    use crate::ranking::load_ranked_domains;
    use crate::session::{check_domain, error_only_record, perform_visit};
    use crate::storage::write_visit;

    /// Results of a crawl run.
    ///
    /// Contains summary statistics about the completed crawl.
    #[derive(Debug, Clone)]
    pub struct CrawlReport {
        /// Number of domains attempted
        pub total: usize,
        /// Number of visits that completed and were written
        pub successful: usize,
        /// Number of visits that failed outright
        pub failed: usize,
        /// Crawl mode of the run
        pub mode: CrawlMode,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs a crawl with the provided arguments.
    ///
    /// This is the main entry point for crawling. Domains are read from the
    /// ranked-domain file (or taken from the single `-u` argument), visited
    /// concurrently under a fixed-size worker pool, and each visit writes
    /// its own JSON record. A single domain's failure never aborts sibling
    /// visits, and no visit is retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker catalog, word list, or domain list
    /// cannot be loaded. Per-domain failures are recorded in the domain's
    /// own record instead.
    pub async fn run_crawl(args: CrawlArgs) -> Result<CrawlReport> {
        let mode = if args.accept {
            CrawlMode::Accept
        } else {
            CrawlMode::Noop
        };

        let catalog = Arc::new(
            TrackerCatalog::load(&args.services).context("Failed to load tracker catalog")?,
        );
        let accept_words = if mode == CrawlMode::Accept {
            let words = AcceptWords::load(&args.accept_words)
                .context("Failed to load accept-word list")?;
            info!("Loaded {} consent-button labels", words.len());
            Arc::new(words)
        } else {
            Arc::new(AcceptWords::default())
        };

        let domains = collect_domains(&args)?;
        if domains.is_empty() {
            anyhow::bail!("No valid domains to crawl");
        }
        info!("Crawling {} domains in {} mode", domains.len(), mode);

        let client = init_client(args.timeout_seconds, &args.user_agent)?;
        let extractor = Arc::new(init_extractor());
        let resolver = init_resolver();
        let semaphore = init_semaphore(args.max_concurrency);
        let stats = Arc::new(CrawlStats::new());

        let start_time = std::time::Instant::now();
        let total = domains.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let mut tasks = FuturesUnordered::new();
        for domain in domains {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .context("Worker pool semaphore closed")?;

            let catalog = Arc::clone(&catalog);
            let accept_words = Arc::clone(&accept_words);
            let client = Arc::clone(&client);
            let extractor = Arc::clone(&extractor);
            let resolver = Arc::clone(&resolver);
            let stats = Arc::clone(&stats);
            let completed = Arc::clone(&completed);
            let failed = Arc::clone(&failed);
            let out_dir = args.out_dir.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = permit;

                // Reachability check: a DNS or timeout failure records only
                // the error counts and ends this domain's visit early.
                let (dns_errors, timeout_errors) = check_domain(&resolver, &domain).await;
                if dns_errors > 0 || timeout_errors > 0 {
                    if dns_errors > 0 {
                        stats.increment(ErrorType::DnsError);
                    }
                    if timeout_errors > 0 {
                        stats.increment(ErrorType::ConnectTimeout);
                    }
                    let record = error_only_record(&domain, dns_errors, timeout_errors);
                    match write_visit(&out_dir, mode, &record) {
                        Ok(_) => failed.fetch_add(1, Ordering::SeqCst),
                        Err(e) => {
                            warn!("Failed to write record for {domain}: {e}");
                            stats.increment(ErrorType::RecordWriteError);
                            failed.fetch_add(1, Ordering::SeqCst)
                        }
                    };
                    return;
                }

                let mut driver = HttpDriver::new(client);
                let visit = tokio::time::timeout(
                    VISIT_TIMEOUT,
                    perform_visit(
                        &mut driver,
                        &domain,
                        mode,
                        &catalog,
                        &extractor,
                        &accept_words,
                    ),
                )
                .await;

                let record = match visit {
                    Ok(outcome) => {
                        if outcome.record.errors.page_load_timeout > 0 {
                            stats.increment(ErrorType::PageLoadError);
                        }
                        if let Some(clicks) = outcome.record.errors.consent_click {
                            stats.add(ErrorType::ConsentClickError, clicks as usize);
                        }
                        stats.add(ErrorType::MalformedRequestUrl, outcome.skipped_requests);
                        outcome.record
                    }
                    Err(_) => {
                        warn!("Visit timed out on {domain}");
                        stats.increment(ErrorType::VisitTimeout);
                        error_only_record(&domain, 0, 1)
                    }
                };

                match write_visit(&out_dir, mode, &record) {
                    Ok(path) => {
                        log::debug!("Wrote {}", path.display());
                        completed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        warn!("Failed to write record for {domain}: {e}");
                        stats.increment(ErrorType::RecordWriteError);
                        failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }));
        }

        let cancel = CancellationToken::new();
        let cancel_logging = cancel.child_token();
        let completed_for_logging = Arc::clone(&completed);
        let failed_for_logging = Arc::clone(&failed);
        let logging_task = Some(tokio::task::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(LOGGING_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        log_progress(start_time, &completed_for_logging, &failed_for_logging, total);
                    }
                    _ = cancel_logging.cancelled() => {
                        break;
                    }
                }
            }
        }));

        while let Some(task_result) = tasks.next().await {
            if let Err(join_error) = task_result {
                failed.fetch_add(1, Ordering::SeqCst);
                warn!("Visit task panicked: {:?}", join_error);
            }
        }

        shutdown_gracefully(cancel, logging_task).await;
        log_progress(start_time, &completed, &failed, total);
        print_error_statistics(&stats);

        Ok(CrawlReport {
            total,
            successful: completed.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
            mode,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Builds the domain list from the crawl arguments: either the single
    /// `-u` argument or the ranked-domain CSV.
    fn collect_domains(args: &CrawlArgs) -> Result<Vec<String>> {
        if let Some(url) = &args.url {
            return Ok(normalize_domain_arg(url).into_iter().collect());
        }
        let input = args
            .input
            .as_ref()
            .context("Either --url or --input is required")?;
        let ranked = load_ranked_domains(input)?;
        Ok(ranked
            .into_iter()
            .filter_map(|r| normalize_domain_arg(&r.domain))
            .collect())
    }
}

//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `consent_crawl` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use consent_crawl::initialization::init_logger;
use consent_crawl::{load_ranked_domains, load_visits, run_crawl, run_report, Command, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    init_logger(config.log_level.clone().into()).context("Failed to initialize logger")?;

    match config.command {
        Command::Crawl(args) => {
            let out_dir = args.out_dir.clone();
            match run_crawl(args).await {
                Ok(report) => {
                    println!(
                        "Visited {} domain{} in {} mode ({} succeeded, {} failed) in {:.1}s",
                        report.total,
                        if report.total == 1 { "" } else { "s" },
                        report.mode,
                        report.successful,
                        report.failed,
                        report.elapsed_seconds
                    );
                    println!("Records saved in {}", out_dir.display());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("consent_crawl error: {:#}", e);
                    process::exit(1);
                }
            }
        }
        Command::Report(args) => {
            let (visits, failures) =
                load_visits(&args.data_dir).context("Failed to load visit records")?;
            let ranked = match &args.ranked {
                Some(path) => Some(
                    load_ranked_domains(path).context("Failed to load ranked domain list")?,
                ),
                None => None,
            };
            match run_report(
                &visits,
                &failures,
                ranked.as_deref(),
                args.top,
                args.export_dir.as_deref(),
            ) {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("consent_crawl error: {:#}", e);
                    process::exit(1);
                }
            }
        }
    }
}

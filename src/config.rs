use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// constants (used as defaults)
pub const WORKER_POOL_SIZE: usize = 10;
pub const LOGGING_INTERVAL_SECS: u64 = 5;

/// Overall wall-clock budget for a single domain visit.
pub const VISIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the pre-flight TCP reachability check (port 80).
pub const CONNECT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent string for HTTP requests.
///
/// A generic Chrome-like string without a pinned version so it does not go
/// stale. Users can override this via the `--user-agent` flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Header capture
/// Header keys and values are truncated to this many characters before being
/// stored in a visit record.
pub const HEADER_TRUNCATE_LEN: usize = 512;

// Redirect handling
/// Maximum number of redirect hops to follow during navigation.
/// Prevents infinite redirect loops and excessive request chains.
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Maximum number of page subresources (scripts, images, stylesheets,
/// iframes) fetched per navigation.
pub const MAX_SUBRESOURCES: usize = 50;

// Reporting
/// Number of entries shown in top-N ranking reports.
pub const DEFAULT_TOP_N: usize = 10;

// Default input/output locations, matching the layout of the crawl dataset.
pub const DEFAULT_DATA_DIR: &str = "./crawl_data";
pub const DEFAULT_SERVICES_FILE: &str = "./services.json";
pub const DEFAULT_ACCEPT_WORDS_FILE: &str = "./accept_words.txt";

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace). Used with the `--log-level` option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field
/// attributes. All options have sensible defaults and can be overridden via
/// command-line flags.
///
/// # Examples
///
/// ```bash
/// # Crawl a ranked domain list without touching consent banners
/// consent_crawl crawl -i tranco-top-500-safe.csv --noop
///
/// # Crawl a single site, accepting its consent banner
/// consent_crawl crawl -u example.com --accept
///
/// # Aggregate both crawls into comparative reports
/// consent_crawl report --data-dir ./crawl_data --ranked tranco-top-500-safe.csv
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "consent_crawl",
    about = "Visits websites in consent-accept and no-interaction modes and reports tracker prevalence."
)]
pub struct Config {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Visit domains and write one JSON record per (domain, mode) pair.
    Crawl(CrawlArgs),
    /// Aggregate visit records into comparative tables.
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Single domain or URL to visit
    #[arg(short = 'u', long = "url", conflicts_with = "input")]
    pub url: Option<String>,

    /// CSV file of ranked domains (columns: tranco_rank, domain)
    #[arg(short = 'i', long = "input", required_unless_present = "url")]
    pub input: Option<PathBuf>,

    /// Interact with consent banners (mutually exclusive with --noop)
    #[arg(long, conflicts_with = "noop")]
    pub accept: bool,

    /// Do not interact with the page after loading (default mode)
    #[arg(long)]
    pub noop: bool,

    /// Directory where visit records are written
    #[arg(long, value_parser, default_value = DEFAULT_DATA_DIR)]
    pub out_dir: PathBuf,

    /// Tracker catalog definition file (nested category/entity/domain JSON)
    #[arg(long, value_parser, default_value = DEFAULT_SERVICES_FILE)]
    pub services: PathBuf,

    /// Word list of consent-button labels, one per line
    #[arg(long, value_parser, default_value = DEFAULT_ACCEPT_WORDS_FILE)]
    pub accept_words: PathBuf,

    /// Maximum concurrent browser-style sessions
    #[arg(long, default_value_t = WORKER_POOL_SIZE)]
    pub max_concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Directory holding the visit records of both crawls
    #[arg(long, value_parser, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Ranked-domain CSV used for the tracker-count-vs-rank report
    #[arg(long, value_parser)]
    pub ranked: Option<PathBuf>,

    /// Number of entries in top-N rankings
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top: usize,

    /// Also write each report as a CSV file into this directory
    #[arg(long, value_parser)]
    pub export_dir: Option<PathBuf>,
}

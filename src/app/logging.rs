//! Progress logging utilities.

use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Logs progress information about domain visits.
///
/// # Arguments
///
/// * `start_time` - The start time of the crawl
/// * `completed` - Atomic counter of completed visits
/// * `failed` - Atomic counter of failed visits
/// * `total` - Total number of domains in the crawl
pub fn log_progress(
    start_time: std::time::Instant,
    completed: &Arc<AtomicUsize>,
    failed: &Arc<AtomicUsize>,
    total: usize,
) {
    let elapsed = start_time.elapsed();
    let done = completed.load(Ordering::SeqCst);
    let failed = failed.load(Ordering::SeqCst);
    let elapsed_secs = elapsed.as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        (done + failed) as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Visited {}/{} domains ({} failed) in {:.2} seconds (~{:.2} domains/sec)",
        done + failed,
        total,
        failed,
        elapsed_secs,
        rate
    );
}

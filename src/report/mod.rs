//! Cross-visit aggregation and reporting.
//!
//! Walks an explicit, injected set of visit records (never the filesystem
//! directly), accumulates counts and value lists per crawl mode, and renders
//! comparative tables to the console and optionally to CSV files. All
//! aggregation is single-threaded and deterministic: rankings sort by count
//! descending with ties broken by key ascending.

mod render;
mod export;

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;

use crate::models::{CrawlMode, RedirectPair, VisitRecord, VisitSet};
use crate::ranking::{rank_lookup, RankedDomain};
use crate::storage::LoadFailure;

pub use render::render_table;

/// A count kept per crawl mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerMode {
    pub accept: u64,
    pub noop: u64,
}

impl PerMode {
    pub fn of(&self, mode: CrawlMode) -> u64 {
        match mode {
            CrawlMode::Accept => self.accept,
            CrawlMode::Noop => self.noop,
        }
    }
}

/// Error-count totals across all visit records of a crawl pair.
///
/// `consent_click` only exists for the accept crawl; the noop column is
/// rendered as `NA`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ErrorTotals {
    pub page_load_timeout: PerMode,
    pub dns: PerMode,
    pub consent_click_accept: u64,
}

/// Sums the per-visit error fields of every record, per mode.
pub fn error_totals(visits: &VisitSet) -> ErrorTotals {
    let mut totals = ErrorTotals::default();
    for record in &visits.accept {
        totals.page_load_timeout.accept += u64::from(record.errors.page_load_timeout);
        totals.dns.accept += u64::from(record.errors.dns);
        totals.consent_click_accept += u64::from(record.errors.consent_click.unwrap_or(0));
    }
    for record in &visits.noop {
        totals.page_load_timeout.noop += u64::from(record.errors.page_load_timeout);
        totals.dns.noop += u64::from(record.errors.dns);
    }
    totals
}

/// Metrics compared between the two crawls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIterMacro)]
pub enum Metric {
    PageLoadTime,
    NumberOfRequests,
    DistinctThirdParties,
    DistinctTrackerDomains,
    DistinctTrackerEntities,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::PageLoadTime => "Page load time",
            Metric::NumberOfRequests => "Number of requests",
            Metric::DistinctThirdParties => "Number of distinct third parties",
            Metric::DistinctTrackerDomains => "Number of distinct tracker domains",
            Metric::DistinctTrackerEntities => "Number of distinct tracker entities",
        }
    }

    /// The metric value of one record. `None` for page-load time when the
    /// visit never reached navigation (error-only record).
    fn value(&self, record: &VisitRecord) -> Option<f64> {
        match self {
            Metric::PageLoadTime => record.page_load_time(),
            Metric::NumberOfRequests => Some(record.request_headers.len() as f64),
            Metric::DistinctThirdParties => {
                Some(record.third_party_request_domains.len() as f64)
            }
            Metric::DistinctTrackerDomains => Some(record.tracker_domains.len() as f64),
            Metric::DistinctTrackerEntities => Some(record.tracker_entities.len() as f64),
        }
    }
}

/// Min/median/max of one metric for one crawl mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

/// Summarizes a value list; `None` when it is empty.
pub fn summarize(mut values: Vec<f64>) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).expect("metric values are finite"));
    let n = values.len();
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    Some(Summary {
        min: values[0],
        median,
        max: values[n - 1],
    })
}

/// One row of the metric-summary table.
#[derive(Debug)]
pub struct MetricSummaryRow {
    pub metric: Metric,
    pub accept: Option<Summary>,
    pub noop: Option<Summary>,
}

/// Min/median/max per metric and mode across all records.
pub fn metric_summaries(visits: &VisitSet) -> Vec<MetricSummaryRow> {
    Metric::iter()
        .map(|metric| {
            let collect = |records: &[VisitRecord]| {
                summarize(records.iter().filter_map(|r| metric.value(r)).collect())
            };
            MetricSummaryRow {
                metric,
                accept: collect(&visits.accept),
                noop: collect(&visits.noop),
            }
        })
        .collect()
}

/// One entry of a top-N ranking, with per-mode counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopEntry {
    pub key: String,
    pub counts: PerMode,
    pub combined: u64,
}

/// Builds a combined top-N ranking from per-mode counts.
///
/// Returns exactly `min(n, distinct keys)` entries sorted by combined count
/// descending, ties by key ascending.
fn top_by_combined(
    accept: &HashMap<String, u64>,
    noop: &HashMap<String, u64>,
    n: usize,
) -> Vec<TopEntry> {
    let keys: HashSet<&String> = accept.keys().chain(noop.keys()).collect();
    let mut entries: Vec<TopEntry> = keys
        .into_iter()
        .map(|key| {
            let a = accept.get(key).copied().unwrap_or(0);
            let o = noop.get(key).copied().unwrap_or(0);
            TopEntry {
                key: key.clone(),
                counts: PerMode { accept: a, noop: o },
                combined: a + o,
            }
        })
        .collect();
    entries.sort_by(|x, y| y.combined.cmp(&x.combined).then(x.key.cmp(&y.key)));
    entries.truncate(n);
    entries
}

fn count_occurrences<'a, I: Iterator<Item = &'a str>>(items: I) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(item.to_string()).or_insert(0) += 1;
    }
    counts
}

/// One row of the most-prevalent third-party-domain table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThirdPartyRow {
    pub domain: String,
    pub counts: PerMode,
    pub is_tracker: bool,
}

/// Most prevalent third-party request domains across both crawls.
///
/// Per-visit domain lists are deduplicated sets, so a count is the number of
/// distinct websites the domain appeared on. The is-tracker flag reflects
/// whether the domain was observed as a tracker hit anywhere in the dataset.
pub fn top_third_party_domains(visits: &VisitSet, n: usize) -> Vec<ThirdPartyRow> {
    let accept = count_occurrences(
        visits
            .accept
            .iter()
            .flat_map(|r| r.third_party_request_domains.iter())
            .map(String::as_str),
    );
    let noop = count_occurrences(
        visits
            .noop
            .iter()
            .flat_map(|r| r.third_party_request_domains.iter())
            .map(String::as_str),
    );
    let observed_trackers: HashSet<&str> = visits
        .accept
        .iter()
        .chain(&visits.noop)
        .flat_map(|r| r.tracker_domains.iter())
        .map(String::as_str)
        .collect();

    top_by_combined(&accept, &noop, n)
        .into_iter()
        .map(|entry| ThirdPartyRow {
            is_tracker: observed_trackers.contains(entry.key.as_str()),
            domain: entry.key,
            counts: entry.counts,
        })
        .collect()
}

/// Most prevalent tracker entities across both crawls.
pub fn top_tracker_entities(visits: &VisitSet, n: usize) -> Vec<TopEntry> {
    let accept = count_occurrences(
        visits
            .accept
            .iter()
            .flat_map(|r| r.tracker_entities.iter())
            .map(String::as_str),
    );
    let noop = count_occurrences(
        visits
            .noop
            .iter()
            .flat_map(|r| r.tracker_entities.iter())
            .map(String::as_str),
    );
    top_by_combined(&accept, &noop, n)
}

/// One row of a per-mode redirect-pair ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRow {
    pub pair: RedirectPair,
    /// Number of distinct websites the pair was observed on.
    pub count: u64,
}

/// Most common tracker-relevant cross-domain redirect pairs of one mode.
///
/// Pairs stored in visit records already satisfy the tracker-relevance
/// invariant (the classifier only emits pairs with a tracker on at least one
/// side), so this is a plain ranking.
pub fn top_redirect_pairs(visits: &VisitSet, mode: CrawlMode, n: usize) -> Vec<RedirectRow> {
    let mut counts: HashMap<&RedirectPair, u64> = HashMap::new();
    for record in visits.of(mode) {
        for pair in &record.x_domain_redirects {
            *counts.entry(pair).or_insert(0) += 1;
        }
    }
    let mut rows: Vec<RedirectRow> = counts
        .into_iter()
        .map(|(pair, count)| RedirectRow {
            pair: pair.clone(),
            count,
        })
        .collect();
    rows.sort_by(|x, y| y.count.cmp(&x.count).then(x.pair.cmp(&y.pair)));
    rows.truncate(n);
    rows
}

/// One point of the tracker-count-vs-site-rank scatter data.
#[derive(Debug, Clone, PartialEq)]
pub struct RankPoint {
    pub rank: u32,
    pub domain: String,
    pub tracker_count: usize,
}

/// Joins each record of one mode against the ranked-domain list, yielding
/// (site rank, distinct tracker-domain count) points. Records whose domain
/// is not in the list are skipped.
pub fn tracker_rank_points(
    visits: &VisitSet,
    mode: CrawlMode,
    ranked: &[RankedDomain],
) -> Vec<RankPoint> {
    let lookup = rank_lookup(ranked);
    let mut points: Vec<RankPoint> = visits
        .of(mode)
        .iter()
        .filter_map(|record| {
            lookup.get(record.domain.as_str()).map(|&rank| RankPoint {
                rank,
                domain: record.domain.clone(),
                tracker_count: record.tracker_domains.len(),
            })
        })
        .collect();
    points.sort_by_key(|p| p.rank);
    points
}

/// Runs every report over the injected dataset: prints console tables and,
/// when `export_dir` is given, writes each report as a CSV file.
pub fn run_report(
    visits: &VisitSet,
    load_failures: &[LoadFailure],
    ranked: Option<&[RankedDomain]>,
    top_n: usize,
    export_dir: Option<&Path>,
) -> Result<()> {
    log::info!(
        "Reporting over {} visit records ({} accept, {} noop)",
        visits.len(),
        visits.accept.len(),
        visits.noop.len()
    );

    let totals = error_totals(visits);
    let summaries = metric_summaries(visits);
    let third_parties = top_third_party_domains(visits, top_n);
    let entities = top_tracker_entities(visits, top_n);
    let redirects_accept = top_redirect_pairs(visits, CrawlMode::Accept, top_n);
    let redirects_noop = top_redirect_pairs(visits, CrawlMode::Noop, top_n);

    render::print_error_totals(&totals);
    render::print_metric_summaries(&summaries);
    render::print_third_parties(&third_parties);
    render::print_tracker_entities(&entities);
    render::print_redirect_pairs(CrawlMode::Accept, &redirects_accept);
    render::print_redirect_pairs(CrawlMode::Noop, &redirects_noop);

    let rank_points = ranked.map(|ranked| {
        let accept = tracker_rank_points(visits, CrawlMode::Accept, ranked);
        let noop = tracker_rank_points(visits, CrawlMode::Noop, ranked);
        render::print_rank_points(CrawlMode::Accept, &accept);
        render::print_rank_points(CrawlMode::Noop, &noop);
        (accept, noop)
    });

    if !load_failures.is_empty() {
        render::print_load_failures(load_failures);
    }

    if let Some(dir) = export_dir {
        export::export_all(
            dir,
            &totals,
            &summaries,
            &third_parties,
            &entities,
            &redirects_accept,
            &redirects_noop,
            rank_points.as_ref(),
        )?;
        log::info!("Reports exported to {}", dir.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VisitErrors, VisitRecord};

    fn visit(
        domain: &str,
        third_parties: &[&str],
        trackers: &[&str],
        entities: &[&str],
    ) -> VisitRecord {
        VisitRecord {
            domain: domain.into(),
            errors: VisitErrors::default(),
            pageload_start_ts: Some(100.0),
            pageload_end_ts: Some(102.0),
            request_headers: vec![Vec::new(); 4],
            third_party_request_domains: third_parties.iter().map(|s| s.to_string()).collect(),
            tracker_domains: trackers.iter().map(|s| s.to_string()).collect(),
            tracker_entities: entities.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn sample_set() -> VisitSet {
        let mut visits = VisitSet::default();
        visits.push(
            CrawlMode::Accept,
            visit(
                "a.com",
                &["tracker.net", "cdn.example"],
                &["tracker.net"],
                &["Tracker Net"],
            ),
        );
        visits.push(
            CrawlMode::Accept,
            visit("b.com", &["tracker.net"], &["tracker.net"], &["Tracker Net"]),
        );
        visits.push(
            CrawlMode::Noop,
            visit("a.com", &["cdn.example"], &[], &[]),
        );
        visits
    }

    #[test]
    fn error_totals_sum_per_visit_fields() {
        let mut visits = VisitSet::default();
        visits.push(
            CrawlMode::Accept,
            VisitRecord {
                domain: "a.com".into(),
                errors: VisitErrors {
                    page_load_timeout: 1,
                    dns: 0,
                    consent_click: Some(2),
                },
                ..Default::default()
            },
        );
        visits.push(
            CrawlMode::Noop,
            VisitRecord {
                domain: "a.com".into(),
                errors: VisitErrors {
                    page_load_timeout: 0,
                    dns: 1,
                    consent_click: None,
                },
                ..Default::default()
            },
        );
        let totals = error_totals(&visits);
        assert_eq!(totals.page_load_timeout, PerMode { accept: 1, noop: 0 });
        assert_eq!(totals.dns, PerMode { accept: 0, noop: 1 });
        assert_eq!(totals.consent_click_accept, 2);
    }

    #[test]
    fn summarize_matches_min_median_max() {
        let summary = summarize(vec![3.0, 1.0, 2.0]).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.median, 2.0);
        assert_eq!(summary.max, 3.0);

        // Even-length input: median is the mean of the middle pair.
        let summary = summarize(vec![4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.median, 2.5);

        assert!(summarize(Vec::new()).is_none());
    }

    #[test]
    fn metric_summary_skips_missing_page_load() {
        let mut visits = sample_set();
        // Error-only record: no timestamps, still counts for request-count
        // metric (zero requests).
        visits.push(
            CrawlMode::Noop,
            VisitRecord {
                domain: "dead.com".into(),
                errors: VisitErrors {
                    dns: 1,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let rows = metric_summaries(&visits);
        let page_load = rows
            .iter()
            .find(|r| r.metric == Metric::PageLoadTime)
            .unwrap();
        // Only the one noop record with timestamps contributes.
        assert_eq!(page_load.noop.unwrap().max, 2.0);
        let requests = rows
            .iter()
            .find(|r| r.metric == Metric::NumberOfRequests)
            .unwrap();
        assert_eq!(requests.noop.unwrap().min, 0.0);
    }

    #[test]
    fn top_third_parties_rank_and_flag() {
        let rows = top_third_party_domains(&sample_set(), 10);
        assert_eq!(rows[0].domain, "tracker.net");
        assert_eq!(rows[0].counts, PerMode { accept: 2, noop: 0 });
        assert!(rows[0].is_tracker);
        assert_eq!(rows[1].domain, "cdn.example");
        assert_eq!(rows[1].counts, PerMode { accept: 1, noop: 1 });
        assert!(!rows[1].is_tracker);
    }

    #[test]
    fn top_n_returns_min_of_n_and_distinct() {
        let rows = top_third_party_domains(&sample_set(), 1);
        assert_eq!(rows.len(), 1);
        let rows = top_third_party_domains(&sample_set(), 50);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn ranking_ties_break_by_key_ascending() {
        let mut visits = VisitSet::default();
        visits.push(
            CrawlMode::Accept,
            visit("a.com", &["zeta.com", "alpha.com"], &[], &[]),
        );
        let rows = top_third_party_domains(&visits, 10);
        assert_eq!(rows[0].domain, "alpha.com");
        assert_eq!(rows[1].domain, "zeta.com");
    }

    #[test]
    fn redirect_pairs_are_counted_per_mode() {
        let mut visits = VisitSet::default();
        let mut record = visit("a.com", &[], &[], &[]);
        record.x_domain_redirects =
            vec![RedirectPair("a.com".into(), "tracker.net".into())];
        visits.push(CrawlMode::Accept, record.clone());
        record.domain = "b.com".into();
        visits.push(CrawlMode::Accept, record);

        let rows = top_redirect_pairs(&visits, CrawlMode::Accept, 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 2);
        assert!(top_redirect_pairs(&visits, CrawlMode::Noop, 10).is_empty());
    }

    #[test]
    fn rank_points_join_against_ranked_list() {
        let ranked = vec![
            RankedDomain {
                tranco_rank: 5,
                domain: "b.com".into(),
            },
            RankedDomain {
                tranco_rank: 1,
                domain: "a.com".into(),
            },
        ];
        let points = tracker_rank_points(&sample_set(), CrawlMode::Accept, &ranked);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].rank, 1);
        assert_eq!(points[0].domain, "a.com");
        assert_eq!(points[0].tracker_count, 1);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let visits = sample_set();
        let first = top_tracker_entities(&visits, 10);
        let second = top_tracker_entities(&visits, 10);
        assert_eq!(first, second);
    }
}

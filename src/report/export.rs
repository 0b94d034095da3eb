//! CSV export of report tables.
//!
//! One file per report, written into the export directory. Rows mirror the
//! console tables so the CSVs can feed external plotting.

use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::models::CrawlMode;

use super::{ErrorTotals, MetricSummaryRow, RankPoint, RedirectRow, ThirdPartyRow, TopEntry};

#[allow(clippy::too_many_arguments)]
pub(super) fn export_all(
    dir: &Path,
    totals: &ErrorTotals,
    summaries: &[MetricSummaryRow],
    third_parties: &[ThirdPartyRow],
    entities: &[TopEntry],
    redirects_accept: &[RedirectRow],
    redirects_noop: &[RedirectRow],
    rank_points: Option<&(Vec<RankPoint>, Vec<RankPoint>)>,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    export_error_totals(&dir.join("failure_table.csv"), totals)?;
    export_summaries(&dir.join("metrics_table.csv"), summaries)?;
    export_third_parties(&dir.join("third_party_domains.csv"), third_parties)?;
    export_entities(&dir.join("tracker_entities.csv"), entities)?;
    export_redirects(
        &dir.join("redirection_pairs_accept.csv"),
        redirects_accept,
    )?;
    export_redirects(&dir.join("redirection_pairs_noop.csv"), redirects_noop)?;
    if let Some((accept, noop)) = rank_points {
        export_rank_points(&dir.join("tracker_vs_rank.csv"), accept, noop)?;
    }
    Ok(())
}

fn writer(path: &Path) -> Result<Writer<std::fs::File>> {
    Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn export_error_totals(path: &Path, totals: &ErrorTotals) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record(["error_type", "crawl_accept", "crawl_noop"])?;
    w.write_record([
        "page_load_timeout",
        &totals.page_load_timeout.accept.to_string(),
        &totals.page_load_timeout.noop.to_string(),
    ])?;
    w.write_record([
        "dns",
        &totals.dns.accept.to_string(),
        &totals.dns.noop.to_string(),
    ])?;
    w.write_record(["consent_click", &totals.consent_click_accept.to_string(), "NA"])?;
    w.flush()?;
    Ok(())
}

fn summary_fields(summary: &Option<super::Summary>) -> [String; 3] {
    match summary {
        Some(s) => [s.min.to_string(), s.median.to_string(), s.max.to_string()],
        None => ["".to_string(), "".to_string(), "".to_string()],
    }
}

fn export_summaries(path: &Path, summaries: &[MetricSummaryRow]) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record([
        "metric",
        "accept_min",
        "accept_median",
        "accept_max",
        "noop_min",
        "noop_median",
        "noop_max",
    ])?;
    for row in summaries {
        let accept = summary_fields(&row.accept);
        let noop = summary_fields(&row.noop);
        let mut record = vec![row.metric.label().to_string()];
        record.extend(accept);
        record.extend(noop);
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

fn export_third_parties(path: &Path, rows: &[ThirdPartyRow]) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record(["domain", "crawl_accept", "crawl_noop", "is_tracker"])?;
    for row in rows {
        w.write_record([
            row.domain.as_str(),
            &row.counts.accept.to_string(),
            &row.counts.noop.to_string(),
            if row.is_tracker { "yes" } else { "no" },
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn export_entities(path: &Path, rows: &[TopEntry]) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record(["entity", "crawl_accept", "crawl_noop"])?;
    for row in rows {
        w.write_record([
            row.key.as_str(),
            &row.counts.accept.to_string(),
            &row.counts.noop.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn export_redirects(path: &Path, rows: &[RedirectRow]) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record(["source_domain", "target_domain", "websites"])?;
    for row in rows {
        w.write_record([
            row.pair.0.as_str(),
            row.pair.1.as_str(),
            &row.count.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn export_rank_points(path: &Path, accept: &[RankPoint], noop: &[RankPoint]) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record(["mode", "rank", "domain", "tracker_domains"])?;
    for (mode, points) in [(CrawlMode::Accept, accept), (CrawlMode::Noop, noop)] {
        for p in points {
            w.write_record([
                mode.suffix(),
                &p.rank.to_string(),
                p.domain.as_str(),
                &p.tracker_count.to_string(),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

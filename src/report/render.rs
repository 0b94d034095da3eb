//! Console table rendering for the report output.

use crate::models::CrawlMode;
use crate::storage::LoadFailure;

use super::{ErrorTotals, MetricSummaryRow, RankPoint, RedirectRow, ThirdPartyRow, TopEntry};

/// Renders a plain-text table: first column left-aligned, the rest
/// right-aligned, with a rule under the header.
pub fn render_table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == 0 {
                    format!("{:<width$}", cell, width = widths[i])
                } else {
                    format!("{:>width$}", cell, width = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format_row(&header_cells));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    out.push('\n');
    for row in rows {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

pub(super) fn print_error_totals(totals: &ErrorTotals) {
    let rows = vec![
        vec![
            "Page load timeout".to_string(),
            totals.page_load_timeout.accept.to_string(),
            totals.page_load_timeout.noop.to_string(),
        ],
        vec![
            "DNS Error".to_string(),
            totals.dns.accept.to_string(),
            totals.dns.noop.to_string(),
        ],
        vec![
            "Consent click error".to_string(),
            totals.consent_click_accept.to_string(),
            "NA".to_string(),
        ],
    ];
    println!(
        "{}",
        render_table(
            "\nFailures encountered during each crawl",
            &["Error type", "Crawl-accept", "Crawl-noop"],
            &rows
        )
    );
}

fn summary_cells(summary: &Option<super::Summary>) -> [String; 3] {
    match summary {
        Some(s) => [
            format!("{:.1}", s.min),
            format!("{:.1}", s.median),
            format!("{:.1}", s.max),
        ],
        None => ["NA".to_string(), "NA".to_string(), "NA".to_string()],
    }
}

pub(super) fn print_metric_summaries(rows: &[MetricSummaryRow]) {
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let accept = summary_cells(&row.accept);
            let noop = summary_cells(&row.noop);
            let mut cells = vec![row.metric.label().to_string()];
            cells.extend(accept);
            cells.extend(noop);
            cells
        })
        .collect();
    println!(
        "{}",
        render_table(
            "\nCrawl metrics (accept: min/median/max | noop: min/median/max)",
            &["Metric", "Min", "Median", "Max", "Min", "Median", "Max"],
            &table_rows
        )
    );
}

pub(super) fn print_third_parties(rows: &[ThirdPartyRow]) {
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.domain.clone(),
                row.counts.accept.to_string(),
                row.counts.noop.to_string(),
                if row.is_tracker { "Yes" } else { "No" }.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            "\nMost prevalent third-party domains",
            &["Third-Party Domain", "Crawl-Accept", "Crawl-Noop", "IsTracker?"],
            &table_rows
        )
    );
}

pub(super) fn print_tracker_entities(rows: &[TopEntry]) {
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.key.clone(),
                row.counts.accept.to_string(),
                row.counts.noop.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            "\nMost prevalent tracker entities",
            &["Tracker entity", "Crawl-Accept", "Crawl-Noop"],
            &table_rows
        )
    );
}

pub(super) fn print_redirect_pairs(mode: CrawlMode, rows: &[RedirectRow]) {
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.pair.0.clone(),
                row.pair.1.clone(),
                row.count.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &format!("\nCross-domain redirect pairs ({})", mode.label()),
            &["Source domain", "Target domain", "Number of distinct websites"],
            &table_rows
        )
    );
}

pub(super) fn print_rank_points(mode: CrawlMode, points: &[RankPoint]) {
    let table_rows: Vec<Vec<String>> = points
        .iter()
        .map(|p| {
            vec![
                p.domain.clone(),
                p.rank.to_string(),
                p.tracker_count.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &format!("\nTracker domains vs. site rank ({})", mode.label()),
            &["Website", "Rank", "Distinct tracker domains"],
            &table_rows
        )
    );
}

pub(super) fn print_load_failures(failures: &[LoadFailure]) {
    let rows: Vec<Vec<String>> = failures
        .iter()
        .map(|f| {
            vec![
                f.path.display().to_string(),
                f.error.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            "\nVisit records skipped during load",
            &["File", "Reason"],
            &rows
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            vec!["a.com".to_string(), "10".to_string()],
            vec!["long-domain.example".to_string(), "3".to_string()],
        ];
        let table = render_table("T", &["Domain", "Count"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "T");
        assert!(lines[1].starts_with("Domain"));
        // All data lines share the same width.
        assert_eq!(lines[3].len(), lines[4].len());
        // Count column is right-aligned.
        assert!(lines[3].ends_with("10"));
        assert!(lines[4].ends_with(" 3"));
    }
}

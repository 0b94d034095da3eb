//! Ranked-domain list loading.
//!
//! The crawl input and the tracker-count-vs-rank report both use a CSV file
//! of ranked domains (columns: `tranco_rank`, `domain`).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One row of the ranked-domain list.
#[derive(Debug, Clone, Deserialize)]
pub struct RankedDomain {
    pub tranco_rank: u32,
    pub domain: String,
}

/// Loads the ranked-domain CSV, preserving file order.
pub fn load_ranked_domains(path: &Path) -> Result<Vec<RankedDomain>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open ranked-domain file {}", path.display()))?;
    let mut domains = Vec::new();
    for row in reader.deserialize() {
        let row: RankedDomain = row
            .with_context(|| format!("Malformed row in ranked-domain file {}", path.display()))?;
        domains.push(row);
    }
    Ok(domains)
}

/// Builds a domain -> rank lookup from the ranked list.
pub fn rank_lookup(ranked: &[RankedDomain]) -> HashMap<&str, u32> {
    ranked
        .iter()
        .map(|r| (r.domain.as_str(), r.tranco_rank))
        .collect()
}

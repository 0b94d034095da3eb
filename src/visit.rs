//! Per-visit aggregation.
//!
//! Folds the classifier output over all captured exchanges of one page visit
//! into the deduplicated sets and raw header bundles stored in a
//! [`VisitRecord`](crate::models::VisitRecord).

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use tldextract::TldExtractor;

use crate::catalog::TrackerCatalog;
use crate::classify::{classify_redirect, classify_tracker};
use crate::config::HEADER_TRUNCATE_LEN;
use crate::domain::registrable_domain;
use crate::models::{HttpExchange, RedirectPair};

lazy_static! {
    /// Matches absolute http(s) URLs embedded in header values.
    static ref URL_PATTERN: Regex = Regex::new(
        r"https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)"
    )
    .unwrap();
}

/// Everything derived from the captured exchanges of one visit.
///
/// Tracker domains, entities, and redirect pairs carry set semantics and are
/// sorted for deterministic serialization. Header bundles and request times
/// are kept in capture order.
#[derive(Debug, Default)]
pub struct HeaderData {
    pub tracker_domains: Vec<String>,
    pub tracker_entities: Vec<String>,
    pub request_headers: Vec<Vec<(String, String)>>,
    pub response_headers: Vec<Vec<(String, String)>>,
    pub request_date: Vec<f64>,
    pub x_domain_redirects: Vec<RedirectPair>,
    /// Requests skipped because their URL had no extractable domain.
    pub skipped_requests: usize,
}

/// Folds all exchanges of one visit into [`HeaderData`].
///
/// Malformed request URLs are logged, counted, and otherwise treated as
/// non-matches; they never abort the fold.
pub fn aggregate_exchanges(
    extractor: &TldExtractor,
    catalog: &TrackerCatalog,
    exchanges: &[HttpExchange],
) -> HeaderData {
    let mut tracker_domains = BTreeSet::new();
    let mut tracker_entities = BTreeSet::new();
    let mut redirects = BTreeSet::new();
    let mut data = HeaderData::default();

    for exchange in exchanges {
        match classify_redirect(extractor, catalog, exchange) {
            Ok(Some(pair)) => {
                redirects.insert(pair);
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping redirect classification: {e}");
                data.skipped_requests += 1;
            }
        }

        match classify_tracker(extractor, catalog, exchange) {
            Ok(Some(hit)) => {
                tracker_domains.insert(hit.domain);
                tracker_entities.insert(hit.entity);
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping tracker classification: {e}");
                data.skipped_requests += 1;
            }
        }

        data.request_headers.push(truncate_bundle(&exchange.request_headers));
        data.request_date.push(exchange.timestamp_ms);
        if let Some(response) = &exchange.response {
            data.response_headers.push(truncate_bundle(&response.headers));
        }
    }

    data.tracker_domains = tracker_domains.into_iter().collect();
    data.tracker_entities = tracker_entities.into_iter().collect();
    data.x_domain_redirects = redirects.into_iter().collect();
    data
}

/// Extracts the distinct third-party registrable domains referenced by URL
/// in a visit's header bundles, excluding the first-party domain itself.
pub fn third_party_domains(
    extractor: &TldExtractor,
    first_party: &str,
    headers: &[Vec<(String, String)>],
) -> Vec<String> {
    let mut found = BTreeSet::new();
    for bundle in headers {
        for (_, value) in bundle {
            for m in URL_PATTERN.find_iter(value) {
                match registrable_domain(extractor, m.as_str()) {
                    Ok(domain) if domain != first_party => {
                        found.insert(domain);
                    }
                    Ok(_) => {}
                    Err(e) => log::debug!("Unparseable URL in header value: {e}"),
                }
            }
        }
    }
    found.into_iter().collect()
}

fn truncate_bundle(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| (truncate(k), truncate(v)))
        .collect()
}

fn truncate(s: &str) -> String {
    s.chars().take(HEADER_TRUNCATE_LEN).collect()
}

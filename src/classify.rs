//! Per-request classification.
//!
//! Given one captured HTTP exchange, decides whether its registrable domain
//! is known tracker infrastructure and, independently, whether the exchange
//! represents a cross-domain redirect involving a tracker domain.

use tldextract::TldExtractor;

use crate::catalog::TrackerCatalog;
use crate::domain::registrable_domain;
use crate::error_handling::ClassifyError;
use crate::models::{HttpExchange, RedirectPair};

/// A request whose registrable domain is in the tracker catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerHit {
    pub domain: String,
    pub entity: String,
}

/// Classifies one exchange against the tracker catalog.
///
/// Returns `Ok(Some(hit))` when the request's registrable domain is a known
/// tracker domain, `Ok(None)` otherwise, and `Err` when the URL is malformed
/// (the caller logs it and counts a skip).
pub fn classify_tracker(
    extractor: &TldExtractor,
    catalog: &TrackerCatalog,
    exchange: &HttpExchange,
) -> Result<Option<TrackerHit>, ClassifyError> {
    let domain = registrable_domain(extractor, &exchange.url)?;
    if !catalog.is_tracker_domain(&domain) {
        return Ok(None);
    }
    // Every domain in the flattened set traces back to an entity, so the
    // attribution lookup cannot miss for a tracker domain.
    let entity = catalog
        .entity_for(&domain)
        .unwrap_or_default()
        .to_string();
    Ok(Some(TrackerHit { domain, entity }))
}

/// Extracts a tracker-relevant cross-domain redirect pair from one exchange.
///
/// A pair (source fld, target fld) is produced only when all of the
/// following hold:
/// - a response exists and its status code is 3xx;
/// - the response carries a `location` header that is not a same-site
///   relative path (leading `/`);
/// - source and target registrable domains differ;
/// - at least one of the two domains is a known tracker domain.
pub fn classify_redirect(
    extractor: &TldExtractor,
    catalog: &TrackerCatalog,
    exchange: &HttpExchange,
) -> Result<Option<RedirectPair>, ClassifyError> {
    let Some(response) = &exchange.response else {
        return Ok(None);
    };
    if !(300..=399).contains(&response.status) {
        return Ok(None);
    }
    let Some(location) = response.header("location") else {
        return Ok(None);
    };
    if location.starts_with('/') {
        // Same-site path: the registrable domain cannot change.
        return Ok(None);
    }

    let source = registrable_domain(extractor, &exchange.url)?;
    let target = registrable_domain(extractor, location)?;
    if source == target {
        return Ok(None);
    }
    if !catalog.is_tracker_domain(&source) && !catalog.is_tracker_domain(&target) {
        return Ok(None);
    }
    Ok(Some(RedirectPair(source, target)))
}

//! Data model for crawl visits.
//!
//! A [`VisitRecord`] is the unit of output of the crawler: one JSON document
//! per (domain, crawl mode) pair, immutable after being written. The
//! reporting side loads these records back and never mutates them.

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;

/// Crawl mode: whether the consent banner was interacted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum CrawlMode {
    /// Consent banner located and clicked.
    Accept,
    /// No interaction after page load.
    Noop,
}

impl CrawlMode {
    /// Suffix used in visit-record filenames (`<domain>_<suffix>.json`).
    pub fn suffix(&self) -> &'static str {
        match self {
            CrawlMode::Accept => "accept",
            CrawlMode::Noop => "noop",
        }
    }

    /// Human label used in report tables.
    pub fn label(&self) -> &'static str {
        match self {
            CrawlMode::Accept => "Crawl-accept",
            CrawlMode::Noop => "Crawl-noop",
        }
    }
}

impl std::fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One captured HTTP request/response pair, as observed by a page driver.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    /// Full request URL.
    pub url: String,
    /// Request headers as (key, value) pairs, untruncated.
    pub request_headers: Vec<(String, String)>,
    /// Request time as epoch milliseconds.
    pub timestamp_ms: f64,
    /// Response, absent when the request never completed.
    pub response: Option<ExchangeResponse>,
}

/// Response half of an [`HttpExchange`].
#[derive(Debug, Clone)]
pub struct ExchangeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ExchangeResponse {
    /// Case-insensitive header lookup, returning the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A cross-domain HTTP redirect: (source registrable domain, target
/// registrable domain). Serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RedirectPair(pub String, pub String);

/// Per-visit error counts.
///
/// `consent_click` is absent for noop visits, where no click is attempted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitErrors {
    pub page_load_timeout: u32,
    pub dns: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_click: Option<u32>,
}

/// A cookie observed during a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Expiry as epoch seconds; absent for session cookies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<f64>,
}

/// One page visit: everything recorded for a single (domain, mode) pair.
///
/// Field names match the on-disk JSON documents. A visit that failed its
/// reachability check carries only `domain` and `errors`; the remaining
/// fields default to empty/absent on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitRecord {
    pub domain: String,
    pub errors: VisitErrors,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pageload_start_ts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pageload_end_ts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_pageload_url: Option<String>,

    /// One header bundle per captured request, keys/values truncated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_headers: Vec<Vec<(String, String)>>,
    /// One header bundle per captured response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_headers: Vec<Vec<(String, String)>>,
    /// Request times as epoch milliseconds, one per captured request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_date: Vec<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracker_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracker_entities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x_domain_redirects: Vec<RedirectPair>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<Cookie>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub third_party_request_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub third_party_response_domains: Vec<String>,
}

impl VisitRecord {
    /// Filename of this record for the given mode.
    pub fn filename(domain: &str, mode: CrawlMode) -> String {
        format!("{}_{}.json", domain, mode.suffix())
    }

    /// Page load duration in seconds, when both timestamps are present.
    pub fn page_load_time(&self) -> Option<f64> {
        match (self.pageload_start_ts, self.pageload_end_ts) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// The explicit dataset reporting operates on: all visit records of a crawl
/// pair, partitioned by mode. Built by `storage::load_visits`, or by hand in
/// tests.
#[derive(Debug, Default)]
pub struct VisitSet {
    pub accept: Vec<VisitRecord>,
    pub noop: Vec<VisitRecord>,
}

impl VisitSet {
    pub fn of(&self, mode: CrawlMode) -> &[VisitRecord] {
        match mode {
            CrawlMode::Accept => &self.accept,
            CrawlMode::Noop => &self.noop,
        }
    }

    pub fn push(&mut self, mode: CrawlMode, record: VisitRecord) {
        match mode {
            CrawlMode::Accept => self.accept.push(record),
            CrawlMode::Noop => self.noop.push(record),
        }
    }

    pub fn len(&self) -> usize {
        self.accept.len() + self.noop.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accept.is_empty() && self.noop.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_includes_mode_suffix() {
        assert_eq!(
            VisitRecord::filename("example.com", CrawlMode::Accept),
            "example.com_accept.json"
        );
        assert_eq!(
            VisitRecord::filename("example.com", CrawlMode::Noop),
            "example.com_noop.json"
        );
    }

    #[test]
    fn error_only_record_round_trips_without_optional_fields() {
        let record = VisitRecord {
            domain: "example.com".into(),
            errors: VisitErrors {
                page_load_timeout: 0,
                dns: 1,
                consent_click: None,
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("pageload_start_ts"));
        assert!(!json.contains("consent_click"));
        assert!(!json.contains("tracker_domains"));

        let back: VisitRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.domain, "example.com");
        assert_eq!(back.errors.dns, 1);
        assert!(back.tracker_domains.is_empty());
    }

    #[test]
    fn redirect_pair_serializes_as_array() {
        let pair = RedirectPair("a.com".into(), "tracker.net".into());
        assert_eq!(
            serde_json::to_string(&pair).unwrap(),
            r#"["a.com","tracker.net"]"#
        );
    }

    #[test]
    fn page_load_time_requires_both_timestamps() {
        let mut record = VisitRecord::default();
        assert_eq!(record.page_load_time(), None);
        record.pageload_start_ts = Some(10.0);
        record.pageload_end_ts = Some(12.5);
        assert_eq!(record.page_load_time(), Some(2.5));
    }

    #[test]
    fn response_header_lookup_is_case_insensitive() {
        let response = ExchangeResponse {
            status: 302,
            headers: vec![("Location".into(), "https://b.com/".into())],
        };
        assert_eq!(response.header("location"), Some("https://b.com/"));
        assert_eq!(response.header("content-type"), None);
    }
}

//! One domain visit, end to end.
//!
//! A visit task owns its driver for the whole session: reachability check,
//! navigation, the consent pass (accept mode only), and folding the captured
//! traffic into a [`VisitRecord`].

use chrono::Utc;
use hickory_resolver::TokioAsyncResolver;
use tldextract::TldExtractor;
use tokio::net::TcpStream;

use crate::catalog::TrackerCatalog;
use crate::config::CONNECT_CHECK_TIMEOUT;
use crate::consent::{accept_cookies, AcceptWords};
use crate::driver::PageDriver;
use crate::models::{CrawlMode, VisitErrors, VisitRecord};
use crate::visit::{aggregate_exchanges, third_party_domains};

/// Result of one visit: the record to persist plus bookkeeping that is not
/// part of the on-disk document.
#[derive(Debug)]
pub struct VisitOutcome {
    pub record: VisitRecord,
    /// Requests whose URL could not be classified (malformed).
    pub skipped_requests: usize,
}

/// Checks whether the domain can be reached at all before a session is
/// spent on it. Returns (dns_errors, timeout_errors).
///
/// A `host:port` input overrides the default port 80. Non-timeout connect
/// failures land in the DNS bucket, matching the error fields the analysis
/// side sums over.
pub async fn check_domain(resolver: &TokioAsyncResolver, domain: &str) -> (u32, u32) {
    let (host, port) = match domain.split_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().unwrap_or(80)),
        None => (domain, 80u16),
    };

    let lookup = match resolver.lookup_ip(host).await {
        Ok(lookup) => lookup,
        Err(e) => {
            log::error!("DNS error occurred on {domain}: {e}");
            return (1, 0);
        }
    };
    let Some(addr) = lookup.iter().next() else {
        log::error!("DNS lookup for {domain} returned no addresses");
        return (1, 0);
    };

    match tokio::time::timeout(CONNECT_CHECK_TIMEOUT, TcpStream::connect((addr, port))).await {
        Ok(Ok(_stream)) => (0, 0),
        Ok(Err(e)) => {
            log::error!("Connection failed on {domain}: {e}");
            (1, 0)
        }
        Err(_) => {
            log::error!("Connection timed out on {domain}");
            (0, 1)
        }
    }
}

/// An error-only record for a domain whose visit never got past the
/// reachability check (or timed out as a whole).
pub fn error_only_record(domain: &str, dns: u32, page_load_timeout: u32) -> VisitRecord {
    VisitRecord {
        domain: domain.to_string(),
        errors: VisitErrors {
            page_load_timeout,
            dns,
            consent_click: None,
        },
        ..Default::default()
    }
}

/// Performs the page visit through the driver and assembles the record.
///
/// Navigation failures do not abort the fold: whatever traffic was captured
/// up to the failure is still classified and recorded, with the failure
/// counted as a page-load timeout.
pub async fn perform_visit<D: PageDriver>(
    driver: &mut D,
    domain: &str,
    mode: CrawlMode,
    catalog: &TrackerCatalog,
    extractor: &TldExtractor,
    accept_words: &AcceptWords,
) -> VisitOutcome {
    let mut errors = VisitErrors::default();

    let start_ts = epoch_seconds();
    let start_url = format!("http://www.{domain}");
    let post_pageload_url = match driver.navigate(&start_url).await {
        Ok(final_url) => {
            log::debug!("Loaded {domain} -> {final_url}");
            Some(final_url)
        }
        Err(e) => {
            log::error!("Page load failed on {domain}: {e:#}");
            errors.page_load_timeout += 1;
            None
        }
    };
    let end_ts = epoch_seconds();

    if mode == CrawlMode::Accept {
        errors.consent_click = Some(accept_cookies(driver, accept_words).await);
    }

    let data = aggregate_exchanges(extractor, catalog, driver.exchanges());
    let third_party_request_domains =
        third_party_domains(extractor, domain, &data.request_headers);
    let third_party_response_domains =
        third_party_domains(extractor, domain, &data.response_headers);

    let record = VisitRecord {
        domain: domain.to_string(),
        errors,
        pageload_start_ts: Some(start_ts),
        pageload_end_ts: Some(end_ts),
        post_pageload_url,
        request_headers: data.request_headers,
        response_headers: data.response_headers,
        request_date: data.request_date,
        tracker_domains: data.tracker_domains,
        tracker_entities: data.tracker_entities,
        x_domain_redirects: data.x_domain_redirects,
        cookies: driver.cookies(),
        third_party_request_domains,
        third_party_response_domains,
    };

    VisitOutcome {
        record,
        skipped_requests: data.skipped_requests,
    }
}

fn epoch_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ConsentCandidate;
    use crate::initialization::init_extractor;
    use crate::models::{Cookie, ExchangeResponse, HttpExchange};
    use serde_json::json;

    fn catalog() -> TrackerCatalog {
        TrackerCatalog::from_value(&json!({
            "categories": {
                "Advertising": [
                    { "Tracker Net": { "http://tracker.net/": ["tracker.net"] } }
                ]
            }
        }))
    }

    /// Driver replaying a fixed navigation: the page plus one tracker
    /// request, a consent button that sets a cookie when clicked.
    struct ReplayDriver {
        exchanges: Vec<HttpExchange>,
        cookies: Vec<Cookie>,
        clicked: bool,
        fail_navigation: bool,
    }

    impl ReplayDriver {
        fn new(fail_navigation: bool) -> Self {
            Self {
                exchanges: Vec::new(),
                cookies: Vec::new(),
                clicked: false,
                fail_navigation,
            }
        }
    }

    impl PageDriver for ReplayDriver {
        async fn navigate(&mut self, url: &str) -> anyhow::Result<String> {
            if self.fail_navigation {
                anyhow::bail!("connection reset");
            }
            self.exchanges.push(HttpExchange {
                url: url.to_string(),
                request_headers: vec![("user-agent".into(), "test".into())],
                timestamp_ms: 1.0,
                response: Some(ExchangeResponse {
                    status: 200,
                    headers: vec![(
                        "link".into(),
                        "<https://cdn.other.com/a.js>; rel=preload".into(),
                    )],
                }),
            });
            self.exchanges.push(HttpExchange {
                url: "https://cdn.tracker.net/pixel.gif".into(),
                request_headers: Vec::new(),
                timestamp_ms: 2.0,
                response: Some(ExchangeResponse {
                    status: 200,
                    headers: Vec::new(),
                }),
            });
            Ok(format!("{url}/"))
        }

        fn exchanges(&self) -> &[HttpExchange] {
            &self.exchanges
        }

        fn cookies(&self) -> Vec<Cookie> {
            self.cookies.clone()
        }

        fn consent_candidates(&self) -> Vec<ConsentCandidate> {
            vec![ConsentCandidate {
                tag: "button".into(),
                text: "Accept all".into(),
                href: Some("https://www.example.com/consent".into()),
            }]
        }

        async fn click(&mut self, _candidate: &ConsentCandidate) -> anyhow::Result<()> {
            self.clicked = true;
            self.cookies.push(Cookie {
                name: "consent".into(),
                value: Some("yes".into()),
                domain: Some("example.com".into()),
                expiry: None,
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn accept_visit_clicks_and_records_everything() {
        let extractor = init_extractor();
        let catalog = catalog();
        let words = AcceptWords::from_lines(["accept all"].into_iter());
        let mut driver = ReplayDriver::new(false);

        let outcome = perform_visit(
            &mut driver,
            "example.com",
            CrawlMode::Accept,
            &catalog,
            &extractor,
            &words,
        )
        .await;

        assert!(driver.clicked);
        let record = outcome.record;
        assert_eq!(record.errors.consent_click, Some(0));
        assert_eq!(record.errors.page_load_timeout, 0);
        assert_eq!(
            record.post_pageload_url.as_deref(),
            Some("http://www.example.com/")
        );
        assert_eq!(record.tracker_domains, vec!["tracker.net"]);
        assert_eq!(record.tracker_entities, vec!["http://tracker.net/"]);
        // The response header referenced cdn.other.com, a third party.
        assert_eq!(record.third_party_response_domains, vec!["other.com"]);
        assert_eq!(record.cookies.len(), 1);
        assert_eq!(record.request_date, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn noop_visit_has_no_consent_click_field() {
        let extractor = init_extractor();
        let catalog = catalog();
        let mut driver = ReplayDriver::new(false);

        let outcome = perform_visit(
            &mut driver,
            "example.com",
            CrawlMode::Noop,
            &catalog,
            &extractor,
            &AcceptWords::default(),
        )
        .await;

        assert!(!driver.clicked);
        assert_eq!(outcome.record.errors.consent_click, None);
    }

    #[tokio::test]
    async fn failed_navigation_is_counted_not_fatal() {
        let extractor = init_extractor();
        let catalog = catalog();
        let mut driver = ReplayDriver::new(true);

        let outcome = perform_visit(
            &mut driver,
            "example.com",
            CrawlMode::Noop,
            &catalog,
            &extractor,
            &AcceptWords::default(),
        )
        .await;

        assert_eq!(outcome.record.errors.page_load_timeout, 1);
        assert_eq!(outcome.record.post_pageload_url, None);
        assert!(outcome.record.tracker_domains.is_empty());
    }

    #[test]
    fn error_only_record_carries_just_domain_and_errors() {
        let record = error_only_record("dead.example", 1, 0);
        assert_eq!(record.domain, "dead.example");
        assert_eq!(record.errors.dns, 1);
        assert_eq!(record.pageload_start_ts, None);
        assert!(record.request_headers.is_empty());
    }
}

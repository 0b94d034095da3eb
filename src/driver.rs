//! Page driver seam.
//!
//! The crawler talks to the page through the [`PageDriver`] trait: navigate
//! to a URL, expose the captured HTTP exchanges and cookies, list candidate
//! consent elements, follow one of their links. The bundled [`HttpDriver`]
//! observes traffic with a plain HTTP client: it resolves the redirect chain
//! manually (each hop recorded as an exchange), fetches the page's
//! subresources, and harvests `Set-Cookie` headers.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use reqwest::Url;
use scraper::{Html, Selector};

use crate::config::{MAX_REDIRECT_HOPS, MAX_SUBRESOURCES};
use crate::models::{Cookie, ExchangeResponse, HttpExchange};

/// A DOM element that might be a consent button.
#[derive(Debug, Clone)]
pub struct ConsentCandidate {
    pub tag: String,
    pub text: String,
    /// Absolute link target, when the element carries one.
    pub href: Option<String>,
}

/// Browser-driver seam: everything the crawl needs from a page session.
///
/// One driver instance is owned by one visit task end-to-end; captured state
/// accumulates across `navigate` and `click` calls.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// Loads the URL, following redirects, and returns the post-load URL.
    async fn navigate(&mut self, url: &str) -> Result<String>;

    /// All HTTP exchanges captured so far, in request order.
    fn exchanges(&self) -> &[HttpExchange];

    /// Cookies observed so far (last write wins per name/domain).
    fn cookies(&self) -> Vec<Cookie>;

    /// Candidate consent elements of the current page.
    fn consent_candidates(&self) -> Vec<ConsentCandidate>;

    /// Follows a candidate's link. Errors when the element has no
    /// followable target.
    async fn click(&mut self, candidate: &ConsentCandidate) -> Result<()>;
}

const CANDIDATE_SELECTOR: &str = "a, button, div, span, form, p";
const SUBRESOURCE_SELECTORS: [&str; 4] =
    ["script[src]", "img[src]", "link[href]", "iframe[src]"];

/// [`PageDriver`] backed by `reqwest`. The client must have automatic
/// redirects disabled so each hop is observed individually.
pub struct HttpDriver {
    client: Arc<reqwest::Client>,
    exchanges: Vec<HttpExchange>,
    cookies: BTreeMap<(String, String), Cookie>,
    page_url: Option<Url>,
    page_html: Option<String>,
}

impl HttpDriver {
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        Self {
            client,
            exchanges: Vec::new(),
            cookies: BTreeMap::new(),
            page_url: None,
            page_html: None,
        }
    }

    /// Sends one GET, records the exchange, and harvests cookies.
    /// The response body is not read here.
    async fn fetch_one(&mut self, url: &str) -> Result<reqwest::Response> {
        let request = self
            .client
            .get(url)
            .build()
            .with_context(|| format!("Failed to build request for {url}"))?;
        let request_headers: Vec<(String, String)> = request
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let timestamp_ms = Utc::now().timestamp_millis() as f64;

        let mut exchange = HttpExchange {
            url: url.to_string(),
            request_headers,
            timestamp_ms,
            response: None,
        };

        match self.client.execute(request).await {
            Ok(response) => {
                let headers: Vec<(String, String)> = response
                    .headers()
                    .iter()
                    .map(|(k, v)| {
                        (
                            k.as_str().to_string(),
                            v.to_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect();
                self.harvest_cookies(&headers);
                exchange.response = Some(ExchangeResponse {
                    status: response.status().as_u16(),
                    headers,
                });
                self.exchanges.push(exchange);
                Ok(response)
            }
            Err(e) => {
                // Keep the request on record even when it never completed.
                self.exchanges.push(exchange);
                Err(e).with_context(|| format!("Request failed for {url}"))
            }
        }
    }

    fn harvest_cookies(&mut self, headers: &[(String, String)]) {
        let now = Utc::now().timestamp() as f64;
        for (key, value) in headers {
            if key.eq_ignore_ascii_case("set-cookie") {
                if let Some(cookie) = parse_set_cookie(value, now) {
                    let slot = (
                        cookie.name.clone(),
                        cookie.domain.clone().unwrap_or_default(),
                    );
                    self.cookies.insert(slot, cookie);
                }
            }
        }
    }

    /// Fetches the page's subresources, each recorded as an exchange.
    /// Individual failures are logged and do not abort the visit.
    async fn fetch_subresources(&mut self, base: &Url, html: &str) {
        let urls = extract_subresource_urls(base, html);
        for url in urls {
            if let Err(e) = self.fetch_one(&url).await {
                log::debug!("Subresource fetch failed: {e:#}");
            }
        }
    }
}

impl PageDriver for HttpDriver {
    async fn navigate(&mut self, url: &str) -> Result<String> {
        let mut current = url.to_string();
        let mut body = String::new();

        for _ in 0..MAX_REDIRECT_HOPS {
            let response = self.fetch_one(&current).await?;
            let status = response.status();
            if status.is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    let next = Url::parse(location).or_else(|_| {
                        Url::parse(&current).and_then(|base| base.join(location))
                    })?;
                    current = next.to_string();
                    continue;
                }
                log::warn!("Redirect status {status} for {current} without Location header");
            }
            body = response
                .text()
                .await
                .with_context(|| format!("Failed to read body of {current}"))?;
            break;
        }

        let final_url =
            Url::parse(&current).with_context(|| format!("Invalid final URL {current}"))?;
        self.fetch_subresources(&final_url, &body).await;
        self.page_url = Some(final_url);
        self.page_html = Some(body);
        Ok(current)
    }

    fn exchanges(&self) -> &[HttpExchange] {
        &self.exchanges
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.cookies.values().cloned().collect()
    }

    fn consent_candidates(&self) -> Vec<ConsentCandidate> {
        let (Some(html), Some(base)) = (&self.page_html, &self.page_url) else {
            return Vec::new();
        };
        // Static selector string, parse cannot fail.
        let selector = Selector::parse(CANDIDATE_SELECTOR).unwrap();
        let document = Html::parse_document(html);
        document
            .select(&selector)
            .map(|element| {
                let href = element
                    .value()
                    .attr("href")
                    .and_then(|href| base.join(href).ok())
                    .map(|u| u.to_string());
                ConsentCandidate {
                    tag: element.value().name().to_string(),
                    text: element.text().collect::<String>(),
                    href,
                }
            })
            .collect()
    }

    async fn click(&mut self, candidate: &ConsentCandidate) -> Result<()> {
        let Some(href) = &candidate.href else {
            bail!(
                "Consent element <{}> has no followable link",
                candidate.tag
            );
        };
        self.fetch_one(href).await?;
        Ok(())
    }
}

/// Resolves `script`/`img`/`link`/`iframe` targets against the page URL,
/// deduplicated and capped at [`MAX_SUBRESOURCES`].
fn extract_subresource_urls(base: &Url, html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for selector_str in SUBRESOURCE_SELECTORS {
        let selector = Selector::parse(selector_str).unwrap();
        for element in document.select(&selector) {
            let attr = if selector_str.contains("href") {
                "href"
            } else {
                "src"
            };
            let Some(raw) = element.value().attr(attr) else {
                continue;
            };
            let Ok(resolved) = base.join(raw) else {
                continue;
            };
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                continue;
            }
            let url = resolved.to_string();
            if seen.insert(url.clone()) {
                urls.push(url);
                if urls.len() >= MAX_SUBRESOURCES {
                    return urls;
                }
            }
        }
    }
    urls
}

/// Parses one `Set-Cookie` header value into a [`Cookie`].
///
/// `Max-Age` takes precedence over `Expires`, per the cookie RFC; a cookie
/// with neither is a session cookie (no expiry).
fn parse_set_cookie(value: &str, now_epoch: f64) -> Option<Cookie> {
    let mut parts = value.split(';');
    let (name, cookie_value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut domain = None;
    let mut expiry = None;
    let mut max_age = None;
    for attr in parts {
        let (key, attr_value) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr.trim(), ""),
        };
        if key.eq_ignore_ascii_case("domain") {
            domain = Some(attr_value.trim_start_matches('.').to_string());
        } else if key.eq_ignore_ascii_case("max-age") {
            max_age = attr_value.parse::<f64>().ok();
        } else if key.eq_ignore_ascii_case("expires") {
            expiry = chrono::DateTime::parse_from_rfc2822(attr_value)
                .ok()
                .map(|dt| dt.timestamp() as f64);
        }
    }

    if let Some(seconds) = max_age {
        expiry = Some(now_epoch + seconds);
    }

    Some(Cookie {
        name: name.to_string(),
        value: Some(cookie_value.trim().to_string()),
        domain,
        expiry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_set_cookie_with_max_age() {
        let cookie =
            parse_set_cookie("sid=abc123; Domain=.example.com; Max-Age=3600; Path=/", 1000.0)
                .unwrap();
        assert_eq!(cookie.name, "sid");
        assert_eq!(cookie.value.as_deref(), Some("abc123"));
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.expiry, Some(4600.0));
    }

    #[test]
    fn parse_set_cookie_with_expires() {
        let cookie = parse_set_cookie(
            "consent=yes; Expires=Wed, 21 Oct 2065 07:28:00 GMT",
            0.0,
        )
        .unwrap();
        assert_eq!(cookie.name, "consent");
        assert!(cookie.expiry.unwrap() > 3_000_000_000.0);
    }

    #[test]
    fn parse_set_cookie_session_cookie_has_no_expiry() {
        let cookie = parse_set_cookie("sess=1; HttpOnly", 0.0).unwrap();
        assert_eq!(cookie.expiry, None);
        assert_eq!(cookie.domain, None);
    }

    #[test]
    fn parse_set_cookie_rejects_garbage() {
        assert!(parse_set_cookie("no-equals-sign", 0.0).is_none());
        assert!(parse_set_cookie("=novalue", 0.0).is_none());
    }

    #[test]
    fn subresource_extraction_resolves_and_caps() {
        let base = Url::parse("https://example.com/page/").unwrap();
        let html = r#"
            <html><head>
              <link href="/style.css" rel="stylesheet">
              <script src="https://cdn.other.com/a.js"></script>
            </head><body>
              <img src="img/logo.png">
              <img src="img/logo.png">
              <iframe src="javascript:void(0)"></iframe>
            </body></html>
        "#;
        let urls = extract_subresource_urls(&base, html);
        assert!(urls.contains(&"https://cdn.other.com/a.js".to_string()));
        assert!(urls.contains(&"https://example.com/style.css".to_string()));
        assert!(urls.contains(&"https://example.com/page/img/logo.png".to_string()));
        // Duplicate img and the javascript: iframe are dropped.
        assert_eq!(urls.len(), 3);
    }
}

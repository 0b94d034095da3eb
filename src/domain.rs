//! Registrable (effective top-level) domain extraction.

use tldextract::TldExtractor;

use crate::error_handling::ClassifyError;

/// Prepends `https://` when the URL carries no scheme, so that bare domains
/// and scheme-less request URLs extract cleanly.
pub fn ensure_scheme(url: &str) -> String {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        format!("https://{url}")
    } else {
        url.to_string()
    }
}

/// Extracts the registrable domain from a URL, e.g.
/// `https://sub.example.co.uk/path` -> `example.co.uk`.
///
/// # Errors
///
/// Returns [`ClassifyError::Domain`] when the URL is malformed or carries no
/// registrable domain (IP addresses, bare suffixes). Callers log the error
/// and treat the request as a non-match.
pub fn registrable_domain(extractor: &TldExtractor, url: &str) -> Result<String, ClassifyError> {
    let normalized = ensure_scheme(url);
    let extract = extractor
        .extract(&normalized)
        .map_err(|e| ClassifyError::Domain {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    match extract.domain {
        Some(main_domain) => Ok(format!(
            "{}.{}",
            main_domain.to_lowercase(),
            extract.suffix.unwrap_or_default()
        )),
        None => Err(ClassifyError::Domain {
            url: url.to_string(),
            reason: "no registrable domain in URL".to_string(),
        }),
    }
}

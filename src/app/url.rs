//! Domain-argument validation and normalization.

use log::warn;

/// Maximum accepted input length; anything longer is junk, not a domain.
const MAX_INPUT_LENGTH: usize = 2048;

/// Normalizes a user-supplied domain argument.
///
/// Accepts a bare domain or a full URL: strips the `http(s)://` scheme and a
/// leading `www.`, then validates that the remainder parses as the host of
/// an https URL. Logs a warning and returns `None` for invalid input.
pub fn normalize_domain_arg(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_INPUT_LENGTH {
        warn!("Skipping invalid domain argument: {input:.50}");
        return None;
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    // Drop any path component a pasted URL might carry.
    let domain = without_www
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    match url::Url::parse(&format!("https://{domain}")) {
        Ok(parsed) if parsed.host_str().is_some() && domain.contains('.') => {
            Some(domain.to_string())
        }
        _ => {
            warn!("Skipping invalid domain argument: {input}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_domain_arg;

    #[test]
    fn bare_domain_passes_through() {
        assert_eq!(
            normalize_domain_arg("example.com"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn scheme_and_www_are_stripped() {
        assert_eq!(
            normalize_domain_arg("https://www.example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(
            normalize_domain_arg("http://example.com/some/path?q=1"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn port_is_preserved() {
        assert_eq!(
            normalize_domain_arg("example.com:8080"),
            Some("example.com:8080".to_string())
        );
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert_eq!(normalize_domain_arg(""), None);
        assert_eq!(normalize_domain_arg("   "), None);
        assert_eq!(normalize_domain_arg("not a domain"), None);
        assert_eq!(normalize_domain_arg("localhost"), None);
    }
}

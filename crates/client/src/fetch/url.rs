//! Origin URL validation.
//!
//! Lookups are keyed on the URL exactly as the client sent it. This module
//! only decides whether that string is something we can fetch.

/// Error type for origin URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse a URL string into a fetchable origin URL.
///
/// Accepts absolute `http` and `https` URLs with a host. No scheme is
/// assumed and nothing is rewritten besides what URL parsing itself
/// normalizes.
pub fn parse_origin_url(input: &str) -> Result<url::Url, UrlError> {
    if input.trim().is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = url::Url::parse(input).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(parsed)
}

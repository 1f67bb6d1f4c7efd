use thiserror::Error;
use url::Url;

/// Errors that can occur when validating a feed endpoint.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a feed endpoint.
///
/// Feed endpoints come from the operator's own configuration, so unlike a
/// user-facing subscribe box there is no private-address filtering here; only
/// the scheme and the presence of a host are enforced.
///
/// # Errors
///
/// - [`UrlValidationError::InvalidUrl`] if the string does not parse
/// - [`UrlValidationError::UnsupportedScheme`] for anything but `http`/`https`
/// - [`UrlValidationError::MissingHost`] if the URL has no host
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("https://feeds.feedburner.com/TechCrunch/").is_ok());
        assert!(validate_url("http://feeds.bbci.co.uk/news/world/rss.xml").is_ok());
    }

    #[test]
    fn test_local_endpoints_allowed() {
        // Operators may point a category at a local relay or a test server
        assert!(validate_url("http://127.0.0.1:8080/feed").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_unparseable_url() {
        assert!(matches!(
            validate_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}

use crate::UrlError;
use url::Url;

/// Validates a submitted crawl target
///
/// # Rules
///
/// 1. Surrounding whitespace is ignored; an empty string is rejected
/// 2. The URL must parse as an absolute URL
/// 3. The scheme must be `http` or `https`
/// 4. The URL must carry a host
///
/// The returned `Url` is the canonical form stored as the job's identity, so
/// `https://example.com` and `https://example.com/` name the same job.
///
/// # Examples
///
/// ```
/// use pagescope::url::validate_target_url;
///
/// let url = validate_target_url(" https://example.com ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/");
/// assert!(validate_target_url("ftp://example.com/file").is_err());
/// ```
pub fn validate_target_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost),
    }
}

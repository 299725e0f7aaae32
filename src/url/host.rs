use url::Url;

/// Extracts the authority host of a URL, keeping an explicit port
///
/// Two links are on the same host only if both the host name and any explicit
/// port agree, so `example.com:8080` and `example.com` are different hosts.
/// Default ports are dropped by the `url` crate during parsing, which makes
/// `http://example.com:80/` equal to `http://example.com/`.
///
/// # Returns
///
/// * `Some(String)` - The lowercase host, with `:port` appended when explicit
/// * `None` - If the URL has no host (e.g. `mailto:` links)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use pagescope::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.com:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com:8443".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

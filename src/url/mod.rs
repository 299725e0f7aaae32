//! URL handling module for PageScope
//!
//! This module provides submission URL validation, host extraction and the
//! internal/external classification of extracted links.

mod host;
mod validate;

use ::url::Url;

// Re-export main functions
pub use host::extract_host;
pub use validate::validate_target_url;

/// Link classification relative to the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// Same host as the page, or no host at all
    Internal,
    /// Any other host
    External,
}

impl LinkClass {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Classifies a resolved link against the page it was found on
///
/// A link is internal iff its host equals the page's host or it has no host;
/// everything else is external. Hosts are compared with [`extract_host`], so an
/// explicit port is part of the comparison.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use pagescope::url::{classify_link, LinkClass};
///
/// let page = Url::parse("https://example.com/").unwrap();
/// let about = Url::parse("https://example.com/about").unwrap();
/// let other = Url::parse("https://other.org/").unwrap();
///
/// assert_eq!(classify_link(&about, &page), LinkClass::Internal);
/// assert_eq!(classify_link(&other, &page), LinkClass::External);
/// ```
pub fn classify_link(link: &Url, page: &Url) -> LinkClass {
    match extract_host(link) {
        None => LinkClass::Internal,
        Some(host) if Some(&host) == extract_host(page).as_ref() => LinkClass::Internal,
        Some(_) => LinkClass::External,
    }
}

//! Link extraction and classification
//!
//! Collects every `<a href>` on a page in document order, resolves it against
//! the page URL and tags it internal or external.

use crate::url::{classify_link, LinkClass};
use scraper::{Html, Selector};
use url::Url;

/// A resolved outbound link, kept only for the duration of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: Url,
    pub class: LinkClass,
}

/// Extracts and classifies the anchors of a document
///
/// # Rules
///
/// - Empty hrefs and pure in-page fragments (`#...`) are skipped
/// - Every other href is resolved against `page_url`; unresolvable ones are
///   dropped without error
/// - Order is document order, which the probe sample depends on
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `page_url` - The URL the page was served from
pub fn extract_links(document: &Html, page_url: &Url) -> Vec<ExtractedLink> {
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&anchor_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_href(href, page_url))
        .map(|url| {
            let class = classify_link(&url, page_url);
            ExtractedLink { url, class }
        })
        .collect()
}

fn resolve_href(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match page_url.join(href) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::trace!("Dropping unresolvable href {:?}: {}", href, e);
            None
        }
    }
}

//! Structural page analysis
//!
//! A single walk over the parsed document collects heading counts, the page
//! title, the declared HTML version and whether the page carries a login form.

use crate::storage::HeadingCounts;
use scraper::{ElementRef, Html};

/// Version label used when the root element declares none
///
/// This is a heuristic: the `version` attribute on `<html>` is checked and the
/// DOCTYPE is ignored, so the reported version is approximate.
pub const DEFAULT_HTML_VERSION: &str = "HTML5";

/// Case-insensitive substrings that mark an input name as a login identity field
const LOGIN_NAME_TOKENS: [&str; 3] = ["user", "email", "login"];

/// Structural summary of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    /// Trimmed first text of the first `<title>`
    pub title: Option<String>,

    /// Declared HTML version, or [`DEFAULT_HTML_VERSION`]
    pub html_version: String,

    pub headings: HeadingCounts,

    pub has_login_form: bool,
}

/// Analyzes a parsed document in one traversal
///
/// The walk uses an explicit stack instead of recursion so deeply nested
/// documents cannot exhaust the call stack. Children are pushed in reverse so
/// elements are visited in document order.
///
/// # Example
///
/// ```
/// use pagescope::crawler::analyze_document;
/// use scraper::Html;
///
/// let document = Html::parse_document(
///     "<html><head><title> Hello </title></head><body><h1>A</h1><h1>B</h1></body></html>",
/// );
/// let summary = analyze_document(&document);
/// assert_eq!(summary.title.as_deref(), Some("Hello"));
/// assert_eq!(summary.headings.h1, 2);
/// assert_eq!(summary.html_version, "HTML5");
/// ```
pub fn analyze_document(document: &Html) -> PageSummary {
    let root = document.root_element();

    let html_version = root
        .value()
        .attr("version")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_HTML_VERSION)
        .to_string();

    let mut title = None;
    let mut headings = HeadingCounts::default();
    let mut has_login_form = false;

    let mut stack = vec![root];
    while let Some(element) = stack.pop() {
        let name = element.value().name();

        if let Some(level) = heading_level(name) {
            headings.record(level);
        } else if name == "title" && title.is_none() {
            title = element
                .first_child()
                .and_then(|node| node.value().as_text())
                .map(|text| text.trim().to_string());
        } else if name == "form" && !has_login_form {
            has_login_form = is_login_form(element);
        }

        stack.extend(element.children().filter_map(ElementRef::wrap).rev());
    }

    PageSummary {
        title,
        html_version,
        headings,
        has_login_form,
    }
}

/// Decides whether a `<form>` looks like a login form
///
/// True iff the form's subtree holds a `password` input and a `text` or
/// `email` input whose name contains `user`, `email` or `login`
/// (case-insensitive). Forms with unconventional field names are missed.
pub fn is_login_form(form: ElementRef<'_>) -> bool {
    let mut has_password = false;
    let mut has_identity = false;

    let inputs = form
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "input");

    for input in inputs {
        let kind = input.value().attr("type").unwrap_or("").to_ascii_lowercase();
        match kind.as_str() {
            "password" => has_password = true,
            "text" | "email" => {
                let name = input.value().attr("name").unwrap_or("").to_lowercase();
                if LOGIN_NAME_TOKENS.iter().any(|token| name.contains(token)) {
                    has_identity = true;
                }
            }
            _ => {}
        }

        if has_password && has_identity {
            return true;
        }
    }

    false
}

fn heading_level(name: &str) -> Option<u8> {
    name.strip_prefix('h')
        .and_then(|digit| digit.parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
}

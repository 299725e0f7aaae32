//! Output module for presenting crawl results
//!
//! This module handles:
//! - Plain-text reports of a single job and of job listings
//! - Markdown export of a job's result
//! - Job statistics for the CLI

mod markdown;
mod report;
mod stats;

pub use markdown::{format_result_markdown, write_result_markdown};
pub use report::{format_job_page, format_result};
pub use stats::{format_statistics, print_statistics};

/// Renders an optional text field, using `-` when absent
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

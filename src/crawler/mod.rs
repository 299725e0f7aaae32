//! Crawler module for single-page crawl attempts
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a bounded redirect chain
//! - Structural page analysis and link extraction
//! - Bounded-concurrency reachability probing of a link sample
//! - Per-job attempt orchestration and the periodic job scheduler

mod analyzer;
mod fetcher;
mod links;
mod orchestrator;
mod prober;
mod scheduler;

pub use analyzer::{analyze_document, is_login_form, PageSummary, DEFAULT_HTML_VERSION};
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use links::{extract_links, ExtractedLink};
pub use orchestrator::Orchestrator;
pub use prober::{probe_link, ProbeFailure, ProbeOutcome, Prober};
pub use scheduler::JobScheduler;

use crate::storage::StorageError;
use thiserror::Error;

/// Reasons a single crawl attempt ends in the `error` state
///
/// The `Display` text of each variant is what gets persisted as the job's
/// error message.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Failed to fetch URL: {0}")]
    Fetch(reqwest::Error),

    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    #[error("Failed to parse HTML: {0}")]
    Parse(String),

    #[error("Failed to persist attempt: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

//! Storage module for persisting crawl jobs
//!
//! This module is the persistence collaborator of the crawl engine:
//! - SQLite database initialization and schema management
//! - Crawl job creation, lookup, listing and full-row updates
//! - The atomic `queued -> running` claim used to guarantee one attempt per job
//! - Broken-link records owned by a job (deleted with it)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::JobStatus;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared between the scheduler, orchestrator and prober
///
/// Every call is a short, synchronous, single-statement operation; callers never
/// hold the guard across an `.await`.
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Wraps a storage backend into a [`SharedStorage`] handle
pub fn shared<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks a shared storage handle
///
/// A lock poisoned by a panicking attempt is recovered: every storage call is a
/// single statement, so a panic cannot leave a half-applied write behind.
pub fn lock(storage: &SharedStorage) -> MutexGuard<'_, dyn Storage + Send + 'static> {
    storage.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovering storage lock poisoned by a panicked task");
        poisoned.into_inner()
    })
}

/// Number of headings found on a page, per level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadingCounts {
    pub h1: u32,
    pub h2: u32,
    pub h3: u32,
    pub h4: u32,
    pub h5: u32,
    pub h6: u32,
}

impl HeadingCounts {
    /// Counts one heading of the given level; levels outside 1..=6 are ignored
    pub fn record(&mut self, level: u8) {
        match level {
            1 => self.h1 += 1,
            2 => self.h2 += 1,
            3 => self.h3 += 1,
            4 => self.h4 += 1,
            5 => self.h5 += 1,
            6 => self.h6 += 1,
            _ => {}
        }
    }

    /// Returns the count for a heading level (0 for levels outside 1..=6)
    pub fn get(&self, level: u8) -> u32 {
        match level {
            1 => self.h1,
            2 => self.h2,
            3 => self.h3,
            4 => self.h4,
            5 => self.h5,
            6 => self.h6,
            _ => 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.h1 + self.h2 + self.h3 + self.h4 + self.h5 + self.h6
    }
}

/// A crawl job and the structural result of its latest attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub id: i64,
    pub url: String,
    pub status: JobStatus,
    pub title: Option<String>,
    pub html_version: Option<String>,
    pub headings: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    pub inaccessible_links: u32,
    pub has_login_form: bool,
    pub error_message: Option<String>,
    pub last_crawled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CrawlJob {
    /// Clears every structural result field, leaving identity and status alone
    pub fn clear_results(&mut self) {
        self.title = None;
        self.html_version = None;
        self.headings = HeadingCounts::default();
        self.internal_links = 0;
        self.external_links = 0;
        self.inaccessible_links = 0;
        self.has_login_form = false;
    }
}

/// A sampled link that failed its reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    pub id: i64,
    pub job_id: i64,
    pub url: String,
    /// HTTP status of the failed probe; 0 when no response was received
    pub status_code: u16,
    pub error_message: String,
    pub created_at: String,
}

/// A job together with every broken link recorded against it
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub job: CrawlJob,
    pub broken_links: Vec<BrokenLink>,
}

/// Filter and pagination for job listings
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    /// Case-insensitive substring matched against URL and title
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// One page of a job listing
#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<CrawlJob>,
    /// Number of jobs matching the filter, across all pages
    pub total: u64,
}

/// Job counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub total: u64,
    pub queued: u64,
    pub running: u64,
    pub completed: u64,
    pub error: u64,
}

impl JobStats {
    pub fn count(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Running => self.running,
            JobStatus::Completed => self.completed,
            JobStatus::Error => self.error,
        }
    }
}

//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::JobStatus;
use crate::storage::{BrokenLink, CrawlJob, JobPage, JobQuery, JobStats};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Crawl job not found: {0}")]
    JobNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Each method is atomic on its own; no operation spans several calls, so callers
/// must tolerate partial persistence (e.g. broken links written but the final job
/// update failing).
pub trait Storage {
    // ===== Job Management =====

    /// Creates a queued job for a URL
    ///
    /// If a job already exists for the URL it is re-queued and its error message
    /// cleared instead, unless an attempt is currently running on it.
    fn create_job(&mut self, url: &str) -> StorageResult<CrawlJob>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<Option<CrawlJob>>;

    /// Gets a job by its URL
    fn get_job_by_url(&self, url: &str) -> StorageResult<Option<CrawlJob>>;

    /// Writes every mutable field of a job
    fn update_job(&mut self, job: &CrawlJob) -> StorageResult<()>;

    /// Deletes jobs (and, by cascade, their broken links)
    ///
    /// # Returns
    ///
    /// The number of jobs removed
    fn delete_jobs(&mut self, job_ids: &[i64]) -> StorageResult<u64>;

    // ===== Lifecycle Transitions =====

    /// Atomically moves a job from `queued` to `running`
    ///
    /// The update is conditional on the persisted status still being `queued`,
    /// so among concurrent claimants exactly one wins.
    ///
    /// # Returns
    ///
    /// * `Some(CrawlJob)` - This caller owns the attempt; `last_crawled_at` is stamped
    /// * `None` - The job does not exist or is no longer queued
    fn claim_job(&mut self, job_id: i64) -> StorageResult<Option<CrawlJob>>;

    /// Moves a job back to `queued` and clears its error message
    ///
    /// Broken links from earlier attempts are kept. A running job is left alone.
    ///
    /// # Returns
    ///
    /// `true` if the job was re-queued
    fn requeue_job(&mut self, job_id: i64) -> StorageResult<bool>;

    /// Returns stale `running` jobs to `queued`
    ///
    /// Only jobs claimed before `claimed_before` are touched, so an attempt
    /// still in flight in this or another process keeps its claim.
    ///
    /// # Returns
    ///
    /// The number of jobs re-queued
    fn reset_stale_jobs(&mut self, claimed_before: DateTime<Utc>) -> StorageResult<u64>;

    // ===== Queries =====

    /// Lists jobs matching a filter, newest first
    fn list_jobs(&self, query: &JobQuery) -> StorageResult<JobPage>;

    /// Fetches up to `limit` jobs in a status, oldest update first
    fn fetch_jobs_in_status(&self, status: JobStatus, limit: usize)
        -> StorageResult<Vec<CrawlJob>>;

    /// Gets job counts per status
    fn job_stats(&self) -> StorageResult<JobStats>;

    // ===== Broken Links =====

    /// Records a broken link against a job
    ///
    /// # Returns
    ///
    /// The ID of the new broken-link row
    fn create_broken_link(
        &mut self,
        job_id: i64,
        url: &str,
        status_code: u16,
        error_message: &str,
    ) -> StorageResult<i64>;

    /// Gets all broken links recorded against a job, newest first
    fn get_broken_links(&self, job_id: i64) -> StorageResult<Vec<BrokenLink>>;
}

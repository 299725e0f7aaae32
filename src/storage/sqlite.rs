//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::JobStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{BrokenLink, CrawlJob, HeadingCounts, JobPage, JobQuery, JobStats};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const JOB_COLUMNS: &str = "id, url, status, title, html_version,
     h1_count, h2_count, h3_count, h4_count, h5_count, h6_count,
     internal_links_count, external_links_count, inaccessible_links_count,
     has_login_form, error_message, last_crawled_at, created_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        // Several processes may share one database file
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Maps a `crawl_jobs` row selected with [`JOB_COLUMNS`]
fn job_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlJob> {
    let status_str: String = row.get(2)?;
    let status = JobStatus::from_db_string(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(StorageError::CorruptRow(format!(
                "unknown job status '{}'",
                status_str
            ))),
        )
    })?;

    Ok(CrawlJob {
        id: row.get(0)?,
        url: row.get(1)?,
        status,
        title: row.get(3)?,
        html_version: row.get(4)?,
        headings: HeadingCounts {
            h1: row.get(5)?,
            h2: row.get(6)?,
            h3: row.get(7)?,
            h4: row.get(8)?,
            h5: row.get(9)?,
            h6: row.get(10)?,
        },
        internal_links: row.get(11)?,
        external_links: row.get(12)?,
        inaccessible_links: row.get(13)?,
        has_login_form: row.get(14)?,
        error_message: row.get(15)?,
        last_crawled_at: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

/// Escapes `%`, `_` and `\` so a search term matches literally inside LIKE
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Storage for SqliteStorage {
    // ===== Job Management =====

    fn create_job(&mut self, url: &str) -> StorageResult<CrawlJob> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_jobs (url, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(url) DO UPDATE SET
                status = excluded.status,
                error_message = NULL,
                updated_at = excluded.updated_at
             WHERE crawl_jobs.status != 'running'",
            params![url, JobStatus::Queued.to_db_string(), now],
        )?;

        self.get_job_by_url(url)?
            .ok_or_else(|| StorageError::CorruptRow(format!("job for {} vanished after insert", url)))
    }

    fn get_job(&self, job_id: i64) -> StorageResult<Option<CrawlJob>> {
        let job = self
            .conn
            .query_row(
                &format!("SELECT {} FROM crawl_jobs WHERE id = ?1", JOB_COLUMNS),
                params![job_id],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn get_job_by_url(&self, url: &str) -> StorageResult<Option<CrawlJob>> {
        let job = self
            .conn
            .query_row(
                &format!("SELECT {} FROM crawl_jobs WHERE url = ?1", JOB_COLUMNS),
                params![url],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn update_job(&mut self, job: &CrawlJob) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_jobs SET
                status = ?1, title = ?2, html_version = ?3,
                h1_count = ?4, h2_count = ?5, h3_count = ?6,
                h4_count = ?7, h5_count = ?8, h6_count = ?9,
                internal_links_count = ?10, external_links_count = ?11,
                inaccessible_links_count = ?12, has_login_form = ?13,
                error_message = ?14, last_crawled_at = ?15, updated_at = ?16
             WHERE id = ?17",
            params![
                job.status.to_db_string(),
                job.title,
                job.html_version,
                job.headings.h1,
                job.headings.h2,
                job.headings.h3,
                job.headings.h4,
                job.headings.h5,
                job.headings.h6,
                job.internal_links,
                job.external_links,
                job.inaccessible_links,
                job.has_login_form,
                job.error_message,
                job.last_crawled_at,
                now,
                job.id,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::JobNotFound(job.id));
        }
        Ok(())
    }

    fn delete_jobs(&mut self, job_ids: &[i64]) -> StorageResult<u64> {
        let mut removed = 0;
        for job_id in job_ids {
            removed += self
                .conn
                .execute("DELETE FROM crawl_jobs WHERE id = ?1", params![job_id])?;
        }
        Ok(removed as u64)
    }

    // ===== Lifecycle Transitions =====

    fn claim_job(&mut self, job_id: i64) -> StorageResult<Option<CrawlJob>> {
        let now = Utc::now().to_rfc3339();
        let claimed = self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, last_crawled_at = ?2, updated_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                JobStatus::Running.to_db_string(),
                now,
                job_id,
                JobStatus::Queued.to_db_string()
            ],
        )?;

        if claimed == 0 {
            return Ok(None);
        }
        self.get_job(job_id)
    }

    fn requeue_job(&mut self, job_id: i64) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let requeued = self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, error_message = NULL, updated_at = ?2
             WHERE id = ?3 AND status != ?4",
            params![
                JobStatus::Queued.to_db_string(),
                now,
                job_id,
                JobStatus::Running.to_db_string()
            ],
        )?;
        Ok(requeued == 1)
    }

    fn reset_stale_jobs(&mut self, claimed_before: DateTime<Utc>) -> StorageResult<u64> {
        let now = Utc::now().to_rfc3339();
        // Claim stamps are UTC RFC 3339, so text order is time order
        let reset = self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, updated_at = ?2
             WHERE status = ?3 AND (last_crawled_at IS NULL OR last_crawled_at < ?4)",
            params![
                JobStatus::Queued.to_db_string(),
                now,
                JobStatus::Running.to_db_string(),
                claimed_before.to_rfc3339()
            ],
        )?;
        Ok(reset as u64)
    }

    // ===== Queries =====

    fn list_jobs(&self, query: &JobQuery) -> StorageResult<JobPage> {
        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            clauses.push("status = ?");
            args.push(Value::Text(status.to_db_string().to_string()));
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            clauses.push("(url LIKE ? ESCAPE '\\' OR title LIKE ? ESCAPE '\\')");
            let pattern = like_pattern(search);
            args.push(Value::Text(pattern.clone()));
            args.push(Value::Text(pattern));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM crawl_jobs {}", where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        args.push(Value::Integer(i64::from(query.limit)));
        args.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_jobs {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            JOB_COLUMNS, where_sql
        ))?;

        let jobs = stmt
            .query_map(params_from_iter(args.iter()), job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(JobPage {
            jobs,
            total: total as u64,
        })
    }

    fn fetch_jobs_in_status(
        &self,
        status: JobStatus,
        limit: usize,
    ) -> StorageResult<Vec<CrawlJob>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_jobs WHERE status = ?1 ORDER BY updated_at ASC, id ASC LIMIT ?2",
            JOB_COLUMNS
        ))?;

        let jobs = stmt
            .query_map(params![status.to_db_string(), limit as i64], job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(jobs)
    }

    fn job_stats(&self) -> StorageResult<JobStats> {
        let mut stats = JobStats::default();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM crawl_jobs GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status_str, count) = row?;
            let count = count as u64;
            stats.total += count;
            match JobStatus::from_db_string(&status_str) {
                Some(JobStatus::Queued) => stats.queued = count,
                Some(JobStatus::Running) => stats.running = count,
                Some(JobStatus::Completed) => stats.completed = count,
                Some(JobStatus::Error) => stats.error = count,
                None => {
                    return Err(StorageError::CorruptRow(format!(
                        "unknown job status '{}'",
                        status_str
                    )))
                }
            }
        }

        Ok(stats)
    }

    // ===== Broken Links =====

    fn create_broken_link(
        &mut self,
        job_id: i64,
        url: &str,
        status_code: u16,
        error_message: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO broken_links (job_id, url, status_code, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![job_id, url, status_code, error_message, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_broken_links(&self, job_id: i64) -> StorageResult<Vec<BrokenLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, job_id, url, status_code, error_message, created_at
             FROM broken_links WHERE job_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let links = stmt
            .query_map(params![job_id], |row| {
                Ok(BrokenLink {
                    id: row.get(0)?,
                    job_id: row.get(1)?,
                    url: row.get(2)?,
                    status_code: row.get(3)?,
                    error_message: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with_job(url: &str) -> (SqliteStorage, CrawlJob) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let job = storage.create_job(url).unwrap();
        (storage, job)
    }

    #[test]
    fn test_create_job_is_queued_with_zero_counters() {
        let (_, job) = storage_with_job("https://example.com/");

        assert!(job.id > 0);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.headings, HeadingCounts::default());
        assert_eq!(job.internal_links, 0);
        assert_eq!(job.external_links, 0);
        assert_eq!(job.inaccessible_links, 0);
        assert!(!job.has_login_form);
        assert_eq!(job.title, None);
        assert_eq!(job.last_crawled_at, None);
    }

    #[test]
    fn test_resubmission_requeues_existing_job() {
        let (mut storage, job) = storage_with_job("https://example.com/");

        let mut failed = job.clone();
        failed.status = JobStatus::Error;
        failed.error_message = Some("HTTP error: 500".to_string());
        storage.update_job(&failed).unwrap();

        let again = storage.create_job("https://example.com/").unwrap();
        assert_eq!(again.id, job.id);
        assert_eq!(again.status, JobStatus::Queued);
        assert_eq!(again.error_message, None);
    }

    #[test]
    fn test_resubmission_leaves_running_job_alone() {
        let (mut storage, job) = storage_with_job("https://example.com/");
        storage.claim_job(job.id).unwrap().unwrap();

        let again = storage.create_job("https://example.com/").unwrap();
        assert_eq!(again.status, JobStatus::Running);
    }

    #[test]
    fn test_update_job_persists_results() {
        let (mut storage, mut job) = storage_with_job("https://example.com/");

        job.status = JobStatus::Completed;
        job.title = Some("Example".to_string());
        job.html_version = Some("HTML5".to_string());
        job.headings.h1 = 2;
        job.headings.h2 = 1;
        job.internal_links = 7;
        job.external_links = 3;
        job.inaccessible_links = 1;
        job.has_login_form = true;
        storage.update_job(&job).unwrap();

        let loaded = storage.get_job(job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.title.as_deref(), Some("Example"));
        assert_eq!(loaded.headings.h1, 2);
        assert_eq!(loaded.headings.h2, 1);
        assert_eq!(loaded.internal_links, 7);
        assert_eq!(loaded.external_links, 3);
        assert_eq!(loaded.inaccessible_links, 1);
        assert!(loaded.has_login_form);
    }

    #[test]
    fn test_update_missing_job() {
        let (mut storage, mut job) = storage_with_job("https://example.com/");
        job.id = 999;
        assert!(matches!(
            storage.update_job(&job),
            Err(StorageError::JobNotFound(999))
        ));
    }

    #[test]
    fn test_claim_is_conditional_on_queued() {
        let (mut storage, job) = storage_with_job("https://example.com/");

        let claimed = storage.claim_job(job.id).unwrap().unwrap();
        assert_eq!(claimed.status, JobStatus::Running);
        assert!(claimed.last_crawled_at.is_some());

        // Second claimant loses
        assert!(storage.claim_job(job.id).unwrap().is_none());
        // Unknown job is never claimed
        assert!(storage.claim_job(4242).unwrap().is_none());
    }

    #[test]
    fn test_requeue_clears_error_and_keeps_broken_links() {
        let (mut storage, job) = storage_with_job("https://example.com/");
        let mut running = storage.claim_job(job.id).unwrap().unwrap();
        storage
            .create_broken_link(job.id, "https://example.com/gone", 404, "HTTP 404")
            .unwrap();

        running.status = JobStatus::Error;
        running.error_message = Some("Failed to fetch URL: timeout".to_string());
        storage.update_job(&running).unwrap();

        assert!(storage.requeue_job(job.id).unwrap());

        let requeued = storage.get_job(job.id).unwrap().unwrap();
        assert_eq!(requeued.status, JobStatus::Queued);
        assert_eq!(requeued.error_message, None);
        assert_eq!(storage.get_broken_links(job.id).unwrap().len(), 1);
    }

    #[test]
    fn test_requeue_refuses_running_job() {
        let (mut storage, job) = storage_with_job("https://example.com/");
        storage.claim_job(job.id).unwrap().unwrap();
        assert!(!storage.requeue_job(job.id).unwrap());
        assert!(!storage.requeue_job(777).unwrap());
    }

    #[test]
    fn test_reset_stale_jobs() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.create_job("https://a.example/").unwrap();
        let b = storage.create_job("https://b.example/").unwrap();
        storage.claim_job(a.id).unwrap();

        // A fresh claim is not stale yet
        let an_hour_ago = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(storage.reset_stale_jobs(an_hour_ago).unwrap(), 0);
        assert_eq!(
            storage.get_job(a.id).unwrap().unwrap().status,
            JobStatus::Running
        );

        let later = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(storage.reset_stale_jobs(later).unwrap(), 1);
        assert_eq!(
            storage.get_job(a.id).unwrap().unwrap().status,
            JobStatus::Queued
        );
        assert_eq!(
            storage.get_job(b.id).unwrap().unwrap().status,
            JobStatus::Queued
        );
    }

    #[test]
    fn test_fetch_jobs_in_status_respects_limit_and_status() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 0..5 {
            storage
                .create_job(&format!("https://example.com/{}", i))
                .unwrap();
        }
        let first = storage
            .get_job_by_url("https://example.com/0")
            .unwrap()
            .unwrap();
        storage.claim_job(first.id).unwrap();

        let queued = storage.fetch_jobs_in_status(JobStatus::Queued, 3).unwrap();
        assert_eq!(queued.len(), 3);
        assert!(queued.iter().all(|j| j.status == JobStatus::Queued));

        let running = storage
            .fetch_jobs_in_status(JobStatus::Running, 10)
            .unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, first.id);
    }

    #[test]
    fn test_list_jobs_filters_and_paginates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 0..5 {
            storage
                .create_job(&format!("https://shop.example/{}", i))
                .unwrap();
        }
        storage.create_job("https://blog.example/").unwrap();

        let page = storage
            .list_jobs(&JobQuery {
                status: Some(JobStatus::Queued),
                search: Some("SHOP".to_string()),
                limit: 2,
                offset: 0,
            })
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.jobs.len(), 2);

        let all = storage
            .list_jobs(&JobQuery {
                limit: 100,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.total, 6);
        // Newest first
        assert_eq!(all.jobs[0].url, "https://blog.example/");

        let none = storage
            .list_jobs(&JobQuery {
                status: Some(JobStatus::Completed),
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(none.total, 0);
        assert!(none.jobs.is_empty());
    }

    #[test]
    fn test_search_matches_wildcards_literally() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_job("https://example.com/100%25").unwrap();
        storage.create_job("https://example.com/plain").unwrap();

        let page = storage
            .list_jobs(&JobQuery {
                search: Some("%".to_string()),
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_broken_links_cascade_on_delete() {
        let (mut storage, job) = storage_with_job("https://example.com/");
        storage
            .create_broken_link(job.id, "https://example.com/a", 404, "HTTP 404")
            .unwrap();
        storage
            .create_broken_link(job.id, "https://down.example/", 0, "connection refused")
            .unwrap();
        assert_eq!(storage.get_broken_links(job.id).unwrap().len(), 2);

        assert_eq!(storage.delete_jobs(&[job.id, 12345]).unwrap(), 1);
        assert!(storage.get_job(job.id).unwrap().is_none());
        assert!(storage.get_broken_links(job.id).unwrap().is_empty());
    }

    #[test]
    fn test_job_stats() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.create_job("https://a.example/").unwrap();
        storage.create_job("https://b.example/").unwrap();
        let mut c = storage.create_job("https://c.example/").unwrap();
        storage.claim_job(a.id).unwrap();
        c.status = JobStatus::Completed;
        storage.update_job(&c).unwrap();

        let stats = storage.job_stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.error, 0);
    }

    #[test]
    fn test_like_pattern_escaping() {
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}

//! Caller-facing crawl service
//!
//! `CrawlService` is the in-process API used by the CLI (and by any outer
//! layer): submission, one-off crawls, results, listings and job maintenance.
//! It wires the shared HTTP client, the storage handle and the orchestrator
//! together, and hands out a [`JobScheduler`] for background processing.

use crate::config::Config;
use crate::crawler::{build_http_client, JobScheduler, Orchestrator};
use crate::state::JobStatus;
use crate::storage::{
    lock, shared, CrawlJob, CrawlResult, JobPage, JobQuery, JobStats, SharedStorage,
    SqliteStorage,
};
use crate::url::validate_target_url;
use crate::{PageScopeError, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Largest page size a listing may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when a listing does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A listing request with 1-based pagination
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub status: Option<JobStatus>,
    pub search: Option<String>,
    /// 1-based page number; 0 is treated as 1
    pub page: u32,
    /// Clamped to `1..=MAX_PAGE_SIZE`
    pub limit: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    fn to_job_query(&self) -> JobQuery {
        let limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        let page = self.page.max(1);
        JobQuery {
            status: self.status,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

/// Outcome of a bulk submission
#[derive(Debug, Default)]
pub struct BulkSubmission {
    /// Jobs created or re-queued, in input order
    pub submitted: Vec<CrawlJob>,

    /// Rejected inputs with the reason, in input order
    pub rejected: Vec<(String, String)>,
}

/// The crawl engine's in-process API
pub struct CrawlService {
    config: Config,
    storage: SharedStorage,
    orchestrator: Arc<Orchestrator>,
}

impl CrawlService {
    /// Creates a service over an existing storage handle
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlService)` - Ready to accept submissions
    /// * `Err(PageScopeError)` - The HTTP client could not be built
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self> {
        let client = build_http_client(&config.user_agent, &config.fetcher)?;
        let orchestrator = Arc::new(Orchestrator::new(
            client,
            storage.clone(),
            &config.prober,
        ));

        Ok(Self {
            config,
            storage,
            orchestrator,
        })
    }

    /// Opens the SQLite database named in the config and creates a service on it
    pub fn open(config: Config) -> Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        Self::new(config, shared(storage))
    }

    /// Creates a scheduler that dispatches this service's queued jobs
    pub fn scheduler(&self) -> JobScheduler {
        JobScheduler::new(
            self.storage.clone(),
            Arc::clone(&self.orchestrator),
            &self.config.scheduler,
        )
    }

    /// Submits a URL for crawling
    ///
    /// The URL is validated before anything is stored. Submitting a URL that
    /// already has a job re-queues that job (unless an attempt is running).
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlJob)` - The queued job
    /// * `Err(PageScopeError::Url)` - The URL is not an absolute http(s) URL
    pub fn submit(&self, url: &str) -> Result<CrawlJob> {
        let target = validate_target_url(url)?;
        let job = lock(&self.storage).create_job(target.as_str())?;
        tracing::info!(job_id = job.id, url = %job.url, status = %job.status, "Job submitted");
        Ok(job)
    }

    /// Submits several URLs, collecting rejections instead of stopping at the first
    ///
    /// Blank entries are ignored.
    pub fn submit_many<I, S>(&self, urls: I) -> BulkSubmission
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = BulkSubmission::default();

        for url in urls {
            let url = url.as_ref().trim();
            if url.is_empty() {
                continue;
            }
            match self.submit(url) {
                Ok(job) => outcome.submitted.push(job),
                Err(e) => {
                    tracing::warn!(url, "Rejected submission: {}", e);
                    outcome.rejected.push((url.to_string(), e.to_string()));
                }
            }
        }

        outcome
    }

    /// Triggers one attempt on a job in the background
    ///
    /// A job in a terminal state is re-queued first. The claim is atomic, so
    /// this never races a scheduler tick into a second attempt.
    ///
    /// # Returns
    ///
    /// * `Ok(JoinHandle)` - Resolves to the job as written when the attempt ends
    /// * `Err(PageScopeError::JobNotFound)` - No such job
    /// * `Err(PageScopeError::AlreadyRunning)` - Another attempt owns the job
    pub fn crawl(&self, job_id: i64) -> Result<JoinHandle<CrawlJob>> {
        let claimed = {
            let mut storage = lock(&self.storage);
            let job = storage
                .get_job(job_id)?
                .ok_or(PageScopeError::JobNotFound(job_id))?;

            if job.status == JobStatus::Running {
                return Err(PageScopeError::AlreadyRunning(job_id));
            }
            if job.status.is_terminal() {
                storage.requeue_job(job_id)?;
            }

            storage
                .claim_job(job_id)?
                .ok_or(PageScopeError::AlreadyRunning(job_id))?
        };

        let orchestrator = Arc::clone(&self.orchestrator);
        Ok(tokio::spawn(async move {
            orchestrator.run_claimed(claimed).await
        }))
    }

    /// Gets a job together with every broken link recorded against it
    pub fn result(&self, job_id: i64) -> Result<CrawlResult> {
        let storage = lock(&self.storage);
        let job = storage
            .get_job(job_id)?
            .ok_or(PageScopeError::JobNotFound(job_id))?;
        let broken_links = storage.get_broken_links(job_id)?;
        Ok(CrawlResult { job, broken_links })
    }

    /// Lists jobs, newest first
    pub fn list(&self, query: &ListQuery) -> Result<JobPage> {
        Ok(lock(&self.storage).list_jobs(&query.to_job_query())?)
    }

    /// Re-queues jobs for another attempt
    ///
    /// Error messages are cleared; broken links from earlier attempts are kept.
    /// Missing and running jobs are skipped.
    ///
    /// # Returns
    ///
    /// The number of jobs re-queued
    pub fn recrawl(&self, job_ids: &[i64]) -> Result<u64> {
        let mut storage = lock(&self.storage);
        let mut requeued = 0;

        for &job_id in job_ids {
            match storage.get_job(job_id)? {
                None => tracing::warn!(job_id, "Cannot re-crawl missing job"),
                Some(job) if !job.status.can_transition_to(JobStatus::Queued) => {
                    tracing::warn!(job_id, status = %job.status, "Cannot re-crawl job now");
                }
                Some(_) => {
                    if storage.requeue_job(job_id)? {
                        requeued += 1;
                    }
                }
            }
        }

        tracing::info!("Re-queued {} of {} job(s)", requeued, job_ids.len());
        Ok(requeued)
    }

    /// Deletes jobs and their broken links
    ///
    /// # Returns
    ///
    /// The number of jobs removed
    pub fn delete(&self, job_ids: &[i64]) -> Result<u64> {
        let removed = lock(&self.storage).delete_jobs(job_ids)?;
        tracing::info!("Deleted {} of {} job(s)", removed, job_ids.len());
        Ok(removed)
    }

    /// Gets job counts per status
    pub fn stats(&self) -> Result<JobStats> {
        Ok(lock(&self.storage).job_stats()?)
    }
}

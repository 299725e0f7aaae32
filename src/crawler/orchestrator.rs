//! Crawl orchestrator - drives one claimed job through a full attempt
//!
//! An attempt runs fetch, analysis, link extraction and probing in order, then
//! writes a terminal status. Every failure inside the attempt, panics included,
//! is converted into an `error` job instead of reaching the caller.

use crate::config::ProberConfig;
use crate::crawler::{analyze_document, extract_links, fetch_page, AttemptError, Prober};
use crate::state::JobStatus;
use crate::storage::{lock, CrawlJob, SharedStorage};
use futures::FutureExt;
use reqwest::Client;
use scraper::Html;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use url::Url;

/// Runs crawl attempts for jobs that have already been claimed
pub struct Orchestrator {
    client: Client,
    storage: SharedStorage,
    prober: Prober,
}

impl Orchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client shared by the fetcher and the prober
    /// * `storage` - Persistence handle for job and broken-link writes
    /// * `prober` - Sampling and budget settings for the probing phase
    pub fn new(client: Client, storage: SharedStorage, prober: &ProberConfig) -> Self {
        let prober = Prober::new(client.clone(), storage.clone(), prober);
        Self {
            client,
            storage,
            prober,
        }
    }

    /// Runs one attempt on a job already in `running` and persists its outcome
    ///
    /// Never fails: fetch, parse and internal errors (including panics in the
    /// attempt) become an `error` status with the error text as message. If the
    /// terminal write itself fails the job is left `running` in storage and the
    /// failure is logged.
    ///
    /// # Returns
    ///
    /// The job as it was written at the end of the attempt
    pub async fn run_claimed(&self, mut job: CrawlJob) -> CrawlJob {
        tracing::info!(job_id = job.id, url = %job.url, "Starting crawl attempt");

        let attempt = AssertUnwindSafe(self.attempt(&mut job)).catch_unwind().await;

        let failure = match attempt {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(AttemptError::Internal(panic_message(payload.as_ref()))),
        };

        match failure {
            None => {
                job.status = JobStatus::Completed;
                job.error_message = None;
                tracing::info!(
                    job_id = job.id,
                    url = %job.url,
                    internal = job.internal_links,
                    external = job.external_links,
                    inaccessible = job.inaccessible_links,
                    "Crawl completed"
                );
            }
            Some(e) => {
                job.clear_results();
                job.status = JobStatus::Error;
                job.error_message = Some(e.to_string());
                tracing::error!(job_id = job.id, url = %job.url, "Crawl failed: {}", e);
            }
        }

        if let Err(e) = lock(&self.storage).update_job(&job) {
            tracing::error!(
                job_id = job.id,
                status = %job.status,
                "Failed to persist attempt outcome: {}",
                e
            );
        }

        job
    }

    async fn attempt(&self, job: &mut CrawlJob) -> Result<(), AttemptError> {
        let target = Url::parse(&job.url)
            .map_err(|e| AttemptError::Internal(format!("stored URL is invalid: {}", e)))?;

        let page = fetch_page(&self.client, &target).await?;
        tracing::debug!(
            job_id = job.id,
            status = page.status_code,
            bytes = page.body.len(),
            "Fetched page"
        );

        // The parsed document is not Send and must be gone before the next await
        let (summary, links) = {
            let document = Html::parse_document(&page.body);
            (
                analyze_document(&document),
                extract_links(&document, &page.final_url),
            )
        };

        job.title = summary.title;
        job.html_version = Some(summary.html_version);
        job.headings = summary.headings;
        job.has_login_form = summary.has_login_form;
        job.internal_links = links.iter().filter(|l| l.class.is_internal()).count() as u32;
        job.external_links = links.len() as u32 - job.internal_links;
        job.inaccessible_links = 0;

        // In-progress results are visible while the job is still running
        lock(&self.storage).update_job(job)?;

        let outcome = self.prober.probe_links(job.id, &links).await;
        job.inaccessible_links = outcome.broken;

        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "attempt panicked".to_string()
    }
}

//! Reachability probing for extracted links
//!
//! This module handles:
//! - Taking the first `sample-cap` links in document order
//! - HEAD probes bounded to `concurrency` in-flight requests
//! - A wall-clock budget for the whole probing phase
//! - Persisting broken links from a single consumer

use crate::config::ProberConfig;
use crate::crawler::ExtractedLink;
use crate::storage::{lock, SharedStorage};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Why a single probe counts as broken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    /// HTTP status of the response, 0 if no response was received
    pub status_code: u16,
    pub message: String,
}

/// Summary of one probing phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Number of links selected for probing
    pub sampled: usize,

    /// Probes that finished within the budget
    pub completed: usize,

    /// Probes that counted as broken
    pub broken: u32,

    /// Whether the budget expired with probes still in flight
    pub budget_exhausted: bool,
}

/// Bounded-concurrency link prober
#[derive(Clone)]
pub struct Prober {
    client: Client,
    storage: SharedStorage,
    sample_cap: usize,
    concurrency: usize,
    budget: Duration,
}

impl Prober {
    /// Creates a prober sharing the fetcher's client
    pub fn new(client: Client, storage: SharedStorage, config: &ProberConfig) -> Self {
        Self {
            client,
            storage,
            sample_cap: config.sample_cap,
            concurrency: config.concurrency.max(1),
            budget: Duration::from_secs(config.budget_secs),
        }
    }

    /// Probes a sample of `links` and records failures against `job_id`
    ///
    /// Only the first `sample-cap` links are probed; the rest are skipped
    /// entirely. Probes still running when the budget expires are dropped
    /// without marking their links broken. A failure to persist one broken
    /// link is logged and does not stop probing.
    pub async fn probe_links(&self, job_id: i64, links: &[ExtractedLink]) -> ProbeOutcome {
        let sample = &links[..links.len().min(self.sample_cap)];
        let mut outcome = ProbeOutcome {
            sampled: sample.len(),
            ..Default::default()
        };

        if sample.is_empty() {
            return outcome;
        }

        tracing::debug!(
            job_id,
            sampled = sample.len(),
            skipped = links.len() - sample.len(),
            "Probing links"
        );

        let consume = async {
            let mut results = stream::iter(sample.to_vec())
                .map(|link| {
                    let client = self.client.clone();
                    async move {
                        let result = probe_link(&client, &link.url).await;
                        (link, result)
                    }
                })
                .buffer_unordered(self.concurrency);

            while let Some((link, result)) = results.next().await {
                outcome.completed += 1;
                if let Some(failure) = result {
                    outcome.broken += 1;
                    self.record_broken(job_id, &link.url, &failure);
                }
            }
        };

        if tokio::time::timeout(self.budget, consume).await.is_err() {
            outcome.budget_exhausted = true;
            tracing::warn!(
                job_id,
                completed = outcome.completed,
                abandoned = outcome.sampled - outcome.completed,
                "Probe budget of {:?} exhausted",
                self.budget
            );
        }

        outcome
    }

    fn record_broken(&self, job_id: i64, url: &Url, failure: &ProbeFailure) {
        tracing::warn!(
            job_id,
            url = %url,
            status = failure.status_code,
            "Broken link: {}",
            failure.message
        );

        let persisted = lock(&self.storage).create_broken_link(
            job_id,
            url.as_str(),
            failure.status_code,
            &failure.message,
        );

        if let Err(e) = persisted {
            tracing::warn!(job_id, url = %url, "Failed to record broken link: {}", e);
        }
    }
}

/// Sends one HEAD probe
///
/// # Returns
///
/// * `None` - The link answered with a status below 400
/// * `Some(ProbeFailure)` - Transport failure (status 0) or a status of 400 or above
pub async fn probe_link(client: &Client, url: &Url) -> Option<ProbeFailure> {
    match client.head(url.clone()).send().await {
        Ok(response) => {
            let status = response.status();
            tracing::trace!(url = %url, status = status.as_u16(), "Probe answered");
            if status.as_u16() >= 400 {
                Some(ProbeFailure {
                    status_code: status.as_u16(),
                    message: format!(
                        "HTTP {} {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("")
                    )
                    .trim_end()
                    .to_string(),
                })
            } else {
                None
            }
        }
        Err(e) => {
            let message = if e.is_timeout() {
                "Link check failed: request timed out".to_string()
            } else {
                format!("Link check failed: {}", e)
            };
            Some(ProbeFailure {
                status_code: 0,
                message,
            })
        }
    }
}

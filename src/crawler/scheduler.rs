//! Job scheduler for promoting queued jobs to running attempts
//!
//! This module handles:
//! - A fixed-interval tick that fetches a bounded batch of queued jobs
//! - A global cap on in-flight attempts via a semaphore
//! - The atomic claim of each job before its attempt is spawned
//! - Recovery of jobs whose claim outlived `stale-after-secs`
//! - Graceful stop of the ticking loop

use crate::config::SchedulerConfig;
use crate::crawler::Orchestrator;
use crate::state::JobStatus;
use crate::storage::{lock, SharedStorage, StorageResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// One dispatch round's worth of state, shared with the ticking task
#[derive(Clone)]
struct Dispatcher {
    storage: SharedStorage,
    orchestrator: Arc<Orchestrator>,
    permits: Arc<Semaphore>,
    batch_size: usize,
}

impl Dispatcher {
    fn dispatch(&self) -> StorageResult<usize> {
        let capacity = self.permits.available_permits().min(self.batch_size);
        if capacity == 0 {
            tracing::debug!("All attempt slots busy, skipping tick");
            return Ok(0);
        }

        let candidates = lock(&self.storage).fetch_jobs_in_status(JobStatus::Queued, capacity)?;

        let mut dispatched = 0;
        for candidate in candidates {
            let Ok(permit) = self.permits.clone().try_acquire_owned() else {
                break;
            };

            // Losing the claim means another tick or caller already owns the job
            let Some(job) = lock(&self.storage).claim_job(candidate.id)? else {
                tracing::debug!(job_id = candidate.id, "Job already claimed elsewhere");
                continue;
            };

            let orchestrator = Arc::clone(&self.orchestrator);
            tokio::spawn(async move {
                let _permit = permit;
                orchestrator.run_claimed(job).await;
            });
            dispatched += 1;
        }

        Ok(dispatched)
    }
}

/// The ticking loop and the channel that stops it
struct TickLoop {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodically dispatches queued jobs to the orchestrator
///
/// The scheduler coordinates:
/// - Discovery: every `poll-interval-secs`, at most `batch-size` queued jobs
/// - Admission: no more than `max-in-flight` attempts run at once, across ticks
/// - Exclusivity: a job is only dispatched after this scheduler won its claim
pub struct JobScheduler {
    dispatcher: Dispatcher,
    poll_interval: Duration,
    max_in_flight: usize,
    stale_after: Duration,
    tick_loop: Option<TickLoop>,
}

impl JobScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `storage` - Persistence handle used for discovery and claims
    /// * `orchestrator` - Runs the attempt for each claimed job
    /// * `config` - Tick interval, batch size and in-flight cap
    pub fn new(
        storage: SharedStorage,
        orchestrator: Arc<Orchestrator>,
        config: &SchedulerConfig,
    ) -> Self {
        let max_in_flight = config.max_in_flight.max(1);
        Self {
            dispatcher: Dispatcher {
                storage,
                orchestrator,
                permits: Arc::new(Semaphore::new(max_in_flight)),
                batch_size: config.batch_size,
            },
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            max_in_flight,
            stale_after: Duration::from_secs(config.stale_after_secs),
            tick_loop: None,
        }
    }

    /// Starts the background ticking loop
    ///
    /// Jobs claimed more than `stale-after-secs` ago and still `running` are
    /// returned to `queued` first; younger claims may belong to a live attempt
    /// in this or another process and are left alone. The first tick fires one
    /// interval after start. Calling `start` on a running scheduler does nothing.
    pub fn start(&mut self) -> StorageResult<()> {
        if self.is_running() {
            tracing::warn!("Scheduler already running");
            return Ok(());
        }

        let cutoff = chrono::Duration::from_std(self.stale_after)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        if let Some(cutoff) = cutoff {
            let recovered = lock(&self.dispatcher.storage).reset_stale_jobs(cutoff)?;
            if recovered > 0 {
                tracing::info!("Re-queued {} abandoned job(s)", recovered);
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.dispatcher.clone(),
            self.poll_interval,
            stop_rx,
        ));
        self.tick_loop = Some(TickLoop { stop_tx, handle });

        tracing::info!(
            interval = ?self.poll_interval,
            batch_size = self.dispatcher.batch_size,
            max_in_flight = self.max_in_flight,
            "Scheduler started"
        );
        Ok(())
    }

    /// Stops future ticks and waits for the ticking loop to finish
    ///
    /// Attempts already dispatched keep running to completion on their own.
    pub async fn stop(&mut self) {
        let Some(tick_loop) = self.tick_loop.take() else {
            return;
        };

        // A closed channel means the loop is already gone
        let _ = tick_loop.stop_tx.send(true);
        if let Err(e) = tick_loop.handle.await {
            tracing::error!("Scheduler loop ended abnormally: {}", e);
        }

        tracing::info!(in_flight = self.in_flight(), "Scheduler stopped");
    }

    /// Runs one dispatch round immediately
    ///
    /// # Returns
    ///
    /// The number of attempts spawned
    pub fn tick(&self) -> StorageResult<usize> {
        self.dispatcher.dispatch()
    }

    /// Whether the ticking loop is active
    pub fn is_running(&self) -> bool {
        self.tick_loop.is_some()
    }

    /// Number of dispatched attempts that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.dispatcher.permits.available_permits()
    }
}

async fn run_loop(dispatcher: Dispatcher, period: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => match dispatcher.dispatch() {
                Ok(0) => tracing::trace!("Tick found no work"),
                Ok(dispatched) => tracing::debug!(dispatched, "Tick dispatched jobs"),
                Err(e) => tracing::error!("Scheduler tick failed: {}", e),
            },
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Scheduler loop exited");
}

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::PriceSource;
use crate::db::RecordStore;
use crate::models::{BackfillJob, BackfillSummary, JobState, PriceRecord};
use crate::queue::{Delivery, JobQueue, RetryOutcome, QUEUE_NAME};
use crate::services::price_service::tolerate;
use crate::utils::{day_start, utc_day, BackfillError, DayCursor, RateLimiter};

/// What happened to one calendar day
#[derive(Debug, Clone, Copy, PartialEq)]
enum DayOutcome {
    AlreadyRecorded,
    Recorded,
    /// Fetched upstream, but another writer stored the day first
    RecordedConcurrently,
    Missing,
}

/// Fills in one record per calendar day from a token's first transfer to today
pub struct BackfillWorker {
    source: Arc<dyn PriceSource>,
    records: Arc<dyn RecordStore>,
    day_delay: Duration,
}

impl BackfillWorker {
    pub fn new(source: Arc<dyn PriceSource>, records: Arc<dyn RecordStore>, day_delay: Duration) -> Self {
        Self {
            source,
            records,
            day_delay,
        }
    }

    /// Run one job through discovery and iteration up to and including `today`.
    ///
    /// Days that already have a record are skipped, so a redelivered job only
    /// fills what is still missing. When `shutdown` flips, the day in flight
    /// finishes and the job stops with [`BackfillError::Interrupted`].
    pub async fn process(
        &self,
        job: &BackfillJob,
        today: NaiveDate,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<BackfillSummary, BackfillError> {
        if !self.source.is_configured() {
            return Err(BackfillError::Configuration("Missing Alchemy API key.".to_string()));
        }

        info!("🔍 {} on {}: {}", job.coin_id, job.network, JobState::DiscoveringGenesis);
        let genesis = self
            .source
            .earliest_transfer(&job.coin_id, &job.network)
            .await
            .map_err(BackfillError::Discovery)?;
        let first_day = utc_day(genesis);
        info!("🎂 Token {} was created on {}", job.coin_id, genesis.to_rfc3339());

        let mut summary = BackfillSummary {
            coin_id: job.coin_id.clone(),
            network: job.network.clone(),
            ..Default::default()
        };

        info!(
            "📅 {} {} from {} to {}",
            JobState::Iterating, job.coin_id, first_day, today
        );
        let mut shutdown = shutdown.clone();
        for day in DayCursor::new(first_day, today) {
            if *shutdown.borrow() {
                info!(
                    "Stopping {} before {} after {} day(s)",
                    job.coin_id, day, summary.days_processed
                );
                return Err(BackfillError::Interrupted);
            }

            let outcome = self.process_day(job, day).await?;
            summary.days_processed += 1;
            match outcome {
                DayOutcome::AlreadyRecorded => {
                    summary.days_skipped += 1;
                    continue;
                }
                DayOutcome::Recorded => summary.records_written += 1,
                DayOutcome::RecordedConcurrently => summary.days_skipped += 1,
                DayOutcome::Missing => summary.days_missing += 1,
            }

            // Rate limit upstream calls; a shutdown cuts the wait short
            if !self.day_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.day_delay) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        Ok(summary)
    }

    async fn process_day(&self, job: &BackfillJob, day: NaiveDate) -> Result<DayOutcome, BackfillError> {
        if self.records.find_one(&job.coin_id, &job.network, day).await?.is_some() {
            debug!("⏩ Price already recorded for {} on {}, skipping", job.coin_id, day);
            return Ok(DayOutcome::AlreadyRecorded);
        }

        let start = day_start(day);
        let fetched = self
            .source
            .historical_price(&job.coin_id, &job.network, start, start + ChronoDuration::days(1))
            .await;

        let Some(price) = tolerate("daily", fetched) else {
            warn!("⚠️ No price data found for {} on {}", job.coin_id, day);
            return Ok(DayOutcome::Missing);
        };

        let record = PriceRecord {
            token_address: job.coin_id.clone(),
            network: job.network.clone(),
            date: day,
            price,
        };
        if self.records.create(&record).await? {
            info!("✅ Saved price for {} on {}: ${}", job.coin_id, day, price);
            Ok(DayOutcome::Recorded)
        } else {
            // Another writer got there first
            debug!("Record for {} on {} already existed on insert", job.coin_id, day);
            Ok(DayOutcome::RecordedConcurrently)
        }
    }
}

/// Single-consumer loop feeding queued jobs to a [`BackfillWorker`]
pub struct BackfillRunner {
    worker: BackfillWorker,
    queue: Arc<dyn JobQueue>,
    limiter: RateLimiter,
    poll_timeout: Duration,
}

impl BackfillRunner {
    /// Jobs are admitted at most once per second, one at a time
    pub fn new(worker: BackfillWorker, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            worker,
            queue,
            limiter: RateLimiter::new(1, Duration::from_secs(1)),
            poll_timeout: Duration::from_secs(5),
        }
    }

    /// Consume until `shutdown` flips. The job in flight is handed back to the
    /// queue after its current day, then the loop exits.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("🚀 Worker listening for jobs on queue: \"{}\"", QUEUE_NAME);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = self.limiter.acquire() => {}
                _ = shutdown.changed() => break,
            }

            let delivery = tokio::select! {
                res = self.queue.dequeue(self.poll_timeout) => res,
                _ = shutdown.changed() => break,
            };

            match delivery {
                Ok(Some(delivery)) => {
                    self.handle(delivery, &shutdown).await;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Failed to dequeue from {}: {}", QUEUE_NAME, e);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        info!("Worker drained, no longer pulling jobs");
    }

    /// Process a single delivery and settle it with the queue
    async fn handle(&self, delivery: Delivery, shutdown: &watch::Receiver<bool>) -> JobState {
        let id = delivery.envelope.id;
        let job = delivery.job().clone();
        info!(
            "Job {} ({} on {}, attempt {}) {}",
            id,
            job.coin_id,
            job.network,
            delivery.envelope.attempts + 1,
            JobState::Dequeued
        );

        let today = utc_day(Utc::now());
        match self.worker.process(&job, today, shutdown).await {
            Ok(summary) => {
                info!(
                    "🎉 Job {} {}: processed {} days, saved {} new prices ({} already recorded, {} without data)",
                    id,
                    JobState::Completed,
                    summary.days_processed,
                    summary.records_written,
                    summary.days_skipped,
                    summary.days_missing
                );
                if let Err(e) = self.queue.ack(&delivery).await {
                    error!("Failed to ack job {}: {}", id, e);
                }
                JobState::Completed
            }
            Err(BackfillError::Interrupted) => {
                info!("Returning job {} to the queue for a later run", id);
                if let Err(e) = self.queue.release(&delivery).await {
                    error!("Failed to release job {}: {}", id, e);
                }
                JobState::Failed
            }
            Err(e) => {
                error!("❌ Job {} {}: {}", id, JobState::Failed, e);
                match self.queue.retry(&delivery).await {
                    Ok(RetryOutcome::Requeued { attempt }) => {
                        warn!("Job {} requeued after {} failed attempt(s)", id, attempt)
                    }
                    Ok(RetryOutcome::Parked) => error!("Job {} exhausted its attempts and was parked", id),
                    Err(e) => error!("Failed to requeue job {}: {}", id, e),
                }
                JobState::Failed
            }
        }
    }

    /// Pull and handle at most one job, waiting up to the poll timeout for it
    pub async fn process_next(&mut self, shutdown: &watch::Receiver<bool>) -> Option<JobState> {
        self.limiter.acquire().await;
        match self.queue.dequeue(self.poll_timeout).await {
            Ok(Some(delivery)) => Some(self.handle(delivery, shutdown).await),
            Ok(None) => None,
            Err(e) => {
                error!("Failed to dequeue from {}: {}", QUEUE_NAME, e);
                None
            }
        }
    }

    #[cfg(test)]
    fn without_admission_limit(mut self) -> Self {
        self.limiter = RateLimiter::new(usize::MAX, Duration::from_secs(1));
        self
    }
}

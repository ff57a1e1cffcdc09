//! Backfill work queue boundary (at-least-once delivery)

pub mod redis_queue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::models::BackfillJob;
use crate::utils::StoreError;

pub use redis_queue::RedisJobQueue;

pub const QUEUE_NAME: &str = "price-history-queue";
pub const JOB_NAME: &str = "fetch-history";

/// What travels through the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: Uuid,
    pub name: String,
    pub data: BackfillJob,
    pub attempts: u32,
}

impl JobEnvelope {
    pub fn new(job: BackfillJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: JOB_NAME.to_string(),
            data: job,
            attempts: 0,
        }
    }
}

/// A job handed to the consumer. It stays owned by the queue until it is
/// acked, retried or released.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub envelope: JobEnvelope,
    /// Serialized form exactly as stored, used to remove it from the active set
    pub(crate) raw: String,
}

impl Delivery {
    pub fn job(&self) -> &BackfillJob {
        &self.envelope.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Requeued { attempt: u32 },
    Parked,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: BackfillJob) -> Result<Uuid, StoreError>;

    /// Wait up to `timeout` for the next job
    async fn dequeue(&self, timeout: Duration) -> Result<Option<Delivery>, StoreError>;

    /// The job finished; forget it
    async fn ack(&self, delivery: &Delivery) -> Result<(), StoreError>;

    /// The job failed; count the attempt and redeliver later, or park it once
    /// attempts are exhausted
    async fn retry(&self, delivery: &Delivery) -> Result<RetryOutcome, StoreError>;

    /// Hand the job back untouched, to be delivered next (used when draining)
    async fn release(&self, delivery: &Delivery) -> Result<(), StoreError>;
}

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{Delivery, JobEnvelope, JobQueue, RetryOutcome, QUEUE_NAME};
use crate::models::BackfillJob;
use crate::utils::StoreError;

/// Redis list queue.
///
/// New jobs are pushed on the left of `:wait` and consumed from the right,
/// moving atomically into `:active` until acknowledged. Jobs that run out of
/// attempts are parked in `:failed`.
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ConnectionManager,
    wait_key: String,
    active_key: String,
    failed_key: String,
    max_attempts: u32,
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager, max_attempts: u32) -> Self {
        Self {
            conn,
            wait_key: format!("{}:wait", QUEUE_NAME),
            active_key: format!("{}:active", QUEUE_NAME),
            failed_key: format!("{}:failed", QUEUE_NAME),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Move jobs left in `:active` by a consumer that died back to the front
    /// of `:wait`. Run once before the worker starts consuming.
    pub async fn recover_stalled(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let mut recovered = 0;
        loop {
            let moved: Option<String> = redis::cmd("LMOVE")
                .arg(&self.active_key)
                .arg(&self.wait_key)
                .arg("RIGHT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }
        if recovered > 0 {
            info!("♻️ Recovered {} stalled job(s) into {}", recovered, self.wait_key);
        }
        Ok(recovered)
    }

    async fn remove_active(&self, raw: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.lrem(&self.active_key, 1, raw).await?;
        if removed == 0 {
            warn!("Job was not in {} when removing it", self.active_key);
        }
        Ok(())
    }

    /// Take `active_raw` out of `:active` and push `payload` onto `target`
    /// in one MULTI/EXEC, so the job is never missing from every list
    async fn move_from_active(
        &self,
        active_raw: &str,
        target: &str,
        end: ListEnd,
        payload: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let (removed,): (i64,) = settle_pipeline(&self.active_key, active_raw, target, end, payload)
            .query_async(&mut conn)
            .await?;
        if removed == 0 {
            warn!("Job was not in {} when moving it to {}", self.active_key, target);
        }
        Ok(())
    }
}

/// Which end of a list a settled job is pushed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEnd {
    /// Consumed last
    Left,
    /// Consumed next
    Right,
}

fn settle_pipeline(active_key: &str, active_raw: &str, target: &str, end: ListEnd, payload: &str) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic().lrem(active_key, 1, active_raw);
    match end {
        ListEnd::Left => pipe.lpush(target, payload).ignore(),
        ListEnd::Right => pipe.rpush(target, payload).ignore(),
    };
    pipe
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: BackfillJob) -> Result<Uuid, StoreError> {
        let envelope = JobEnvelope::new(job);
        let raw = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.wait_key, raw).await?;
        Ok(envelope.id)
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<Delivery>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("BLMOVE")
            .arg(&self.wait_key)
            .arg(&self.active_key)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<JobEnvelope>(&raw) {
            Ok(envelope) => Ok(Some(Delivery { envelope, raw })),
            Err(e) => {
                error!("Discarding malformed job payload into {}: {}", self.failed_key, e);
                self.move_from_active(&raw, &self.failed_key, ListEnd::Left, &raw).await?;
                Ok(None)
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), StoreError> {
        self.remove_active(&delivery.raw).await
    }

    async fn retry(&self, delivery: &Delivery) -> Result<RetryOutcome, StoreError> {
        let mut envelope = delivery.envelope.clone();
        envelope.attempts += 1;
        let raw = serde_json::to_string(&envelope)?;

        if envelope.attempts >= self.max_attempts {
            self.move_from_active(&delivery.raw, &self.failed_key, ListEnd::Left, &raw).await?;
            Ok(RetryOutcome::Parked)
        } else {
            // Back of the line
            self.move_from_active(&delivery.raw, &self.wait_key, ListEnd::Left, &raw).await?;
            Ok(RetryOutcome::Requeued {
                attempt: envelope.attempts,
            })
        }
    }

    async fn release(&self, delivery: &Delivery) -> Result<(), StoreError> {
        self.move_from_active(&delivery.raw, &self.wait_key, ListEnd::Right, &delivery.raw).await
    }
}

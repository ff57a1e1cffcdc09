use std::sync::Arc;
use tracing::info;

use crate::models::BackfillJob;
use crate::queue::{JobQueue, QUEUE_NAME};
use crate::utils::StoreError;

/// Accepts backfill requests and hands them to the job queue
pub struct ScheduleService {
    queue: Arc<dyn JobQueue>,
}

impl ScheduleService {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    /// Enqueue a backfill and return the confirmation message.
    /// Nothing is deduplicated here; the worker skips days already recorded.
    pub async fn schedule(&self, job: BackfillJob) -> Result<String, StoreError> {
        let coin_id = job.coin_id.clone();
        let network = job.network.clone();
        let id = self.queue.enqueue(job).await?;
        info!("📬 Job {} added to {} for {} on {}", id, QUEUE_NAME, coin_id, network);
        Ok(format!("History fetch for {} has been scheduled.", coin_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryQueue;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_schedule_enqueues_job() {
        let queue = Arc::new(MemoryQueue::new(3));
        let svc = ScheduleService::new(queue.clone());

        let message = svc.schedule(BackfillJob::new("0xABC", "Base")).await.unwrap();

        assert_eq!(message, "History fetch for 0xabc has been scheduled.");
        let waiting = queue.wait.lock().unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].data, BackfillJob::new("0xabc", "base"));
    }

    #[tokio::test]
    async fn test_duplicate_requests_both_enqueued() {
        let queue = Arc::new(MemoryQueue::new(3));
        let svc = ScheduleService::new(queue.clone());

        svc.schedule(BackfillJob::new("0xabc", "base")).await.unwrap();
        svc.schedule(BackfillJob::new("0xabc", "base")).await.unwrap();
        assert_eq!(queue.wait.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_queue_failure_surfaces() {
        let queue = Arc::new(MemoryQueue::new(3));
        queue.fail_enqueue.store(true, Ordering::SeqCst);
        let svc = ScheduleService::new(queue.clone());

        assert!(svc.schedule(BackfillJob::new("0xabc", "base")).await.is_err());
        assert!(queue.wait.lock().unwrap().is_empty());
    }
}

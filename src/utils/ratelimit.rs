/// Sliding-window rate limiter used to admit backfill jobs
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    /// Timestamps of admissions inside the current window
    request_times: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            request_times: VecDeque::new(),
            max_requests: max_requests.max(1),
            window,
        }
    }

    /// Record an admission if the window allows it, otherwise return how
    /// long the caller must wait before trying again
    fn check_and_record(&mut self, now: Instant) -> Duration {
        // Remove old timestamps outside the window
        while let Some(&front) = self.request_times.front() {
            if now.duration_since(front) >= self.window {
                self.request_times.pop_front();
            } else {
                break;
            }
        }

        if self.request_times.len() >= self.max_requests {
            if let Some(&oldest) = self.request_times.front() {
                let elapsed = now.duration_since(oldest);
                if elapsed < self.window {
                    return self.window - elapsed;
                }
            }
        }

        self.request_times.push_back(now);
        Duration::ZERO
    }

    /// Wait until an admission slot is free, then take it
    pub async fn acquire(&mut self) {
        loop {
            let wait_duration = self.check_and_record(Instant::now());
            if wait_duration.is_zero() {
                return;
            }
            tracing::debug!("Job admission rate limit: waiting {}ms", wait_duration.as_millis());
            tokio::time::sleep(wait_duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_requests_within_limit() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(1));
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check_and_record(now), Duration::ZERO);
        }
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(1));
        let now = Instant::now();

        limiter.check_and_record(now);
        let wait = limiter.check_and_record(now + Duration::from_millis(400));
        assert_eq!(wait, Duration::from_millis(600));
    }

    #[test]
    fn test_rate_limiter_frees_slot_after_window() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(1));
        let now = Instant::now();

        limiter.check_and_record(now);
        let wait = limiter.check_and_record(now + Duration::from_secs(1));
        assert_eq!(wait, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_acquire_first_slot_is_immediate() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(60));
        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::PriceSource;
use crate::cache::{CacheStore, CACHE_TTL};
use crate::models::{CacheEntry, HistoryPoint, PriceMethod, TimeRange};
use crate::services::cache_key::{build_key, CacheInstant};
use crate::utils::{day_start, utc_day, PriceError};

/// Sampled price history over a lookback window, one point per bucket
pub struct PriceHistoryService {
    source: Arc<dyn PriceSource>,
    cache: Arc<dyn CacheStore>,
}

impl PriceHistoryService {
    pub fn new(source: Arc<dyn PriceSource>, cache: Arc<dyn CacheStore>) -> Self {
        Self { source, cache }
    }

    /// Walk the buckets of `range` ending at `now`, oldest first.
    ///
    /// Buckets start at UTC midnight. A bucket whose upstream fetch fails is
    /// left out; a bucket the source has no data for is returned with no price.
    pub async fn history(
        &self,
        token_address: &str,
        network: &str,
        range: TimeRange,
        now: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, PriceError> {
        let width = range.bucket_width();
        let mut bucket_start = day_start(utc_day(range.start(now)));
        let mut points = Vec::new();

        while bucket_start < now {
            let date = bucket_start.date_naive();
            let cache_key = build_key(token_address, network, CacheInstant::Day(date));

            if let Some(entry) = self.read_cache(&cache_key).await {
                debug!("📦 Cache HIT {}", cache_key);
                points.push(HistoryPoint {
                    date,
                    price: entry.history_price,
                    method: PriceMethod::Cache,
                });
                bucket_start += width;
                continue;
            }

            if !self.source.is_configured() {
                return Err(PriceError::Configuration("Missing Alchemy API key.".to_string()));
            }

            match self
                .source
                .historical_price(token_address, network, bucket_start, bucket_start + width)
                .await
            {
                Ok(Some(price)) => {
                    self.write_cache(&cache_key, price).await;
                    points.push(HistoryPoint {
                        date,
                        price: Some(price),
                        method: PriceMethod::Alchemy,
                    });
                }
                Ok(None) => points.push(HistoryPoint {
                    date,
                    price: None,
                    method: PriceMethod::None,
                }),
                Err(e) => warn!("Error fetching historical price for bucket {}: {}", date, e),
            }

            bucket_start += width;
        }

        Ok(points)
    }

    async fn read_cache(&self, key: &str) -> Option<CacheEntry> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| warn!("Ignoring unreadable cache entry {}: {}", key, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, price: f64) {
        let entry = CacheEntry {
            current_price: None,
            history_price: Some(price),
            method: PriceMethod::Alchemy,
        };
        match serde_json::to_string(&entry) {
            Ok(payload) => {
                if let Err(e) = self.cache.set(key, &payload, CACHE_TTL).await {
                    warn!("Error caching bucket price for {}: {}", key, e);
                }
            }
            Err(e) => warn!("Could not serialize cache entry {}: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCache, Scripted, ScriptedSource};
    use chrono::{NaiveDate, TimeZone};
    use std::sync::atomic::Ordering;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_window(day: NaiveDate, days: i64) -> (i64, i64) {
        let start = day_start(day).timestamp();
        (start, start + days * 86_400)
    }

    #[tokio::test]
    async fn test_week_has_daily_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let (s, e) = day_window(date(2024, 3, 5), 1);
        let source = Arc::new(ScriptedSource::default().with_historical(s, e, Scripted::Price(4.0)));
        let cache = Arc::new(MemoryCache::default());
        let svc = PriceHistoryService::new(source.clone(), cache.clone());

        let points = svc.history("0xAAA", "base", TimeRange::OneWeek, now).await.unwrap();

        // Mar 3 .. Mar 10 inclusive, all starting before `now`
        assert_eq!(points.len(), 8);
        assert_eq!(points[0].date, date(2024, 3, 3));
        assert_eq!(points[7].date, date(2024, 3, 10));
        assert_eq!(points[2].price, Some(4.0));
        assert_eq!(points[2].method, PriceMethod::Alchemy);
        assert_eq!(points[3].price, None);
        assert_eq!(points[3].method, PriceMethod::None);
        assert_eq!(cache.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_walk_reads_cached_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let (s, e) = day_window(date(2024, 3, 5), 1);
        let source = Arc::new(ScriptedSource::default().with_historical(s, e, Scripted::Price(4.0)));
        let cache = Arc::new(MemoryCache::default());
        let svc = PriceHistoryService::new(source.clone(), cache.clone());

        svc.history("0xAAA", "base", TimeRange::OneWeek, now).await.unwrap();
        let calls = source.historical_calls.load(Ordering::SeqCst);
        let points = svc.history("0xaaa", "BASE", TimeRange::OneWeek, now).await.unwrap();

        assert_eq!(points[2].method, PriceMethod::Cache);
        assert_eq!(points[2].price, Some(4.0));
        // Only the uncached (empty) buckets were fetched again
        assert_eq!(source.historical_calls.load(Ordering::SeqCst), calls + 7);
    }

    #[tokio::test]
    async fn test_failed_bucket_is_skipped() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let (s, e) = day_window(date(2024, 3, 4), 1);
        let source = Arc::new(ScriptedSource::default().with_historical(s, e, Scripted::Fail));
        let cache = Arc::new(MemoryCache::default());
        let svc = PriceHistoryService::new(source, cache);

        let points = svc.history("0xAAA", "base", TimeRange::OneWeek, now).await.unwrap();
        assert_eq!(points.len(), 7);
        assert!(points.iter().all(|p| p.date != date(2024, 3, 4)));
    }

    #[tokio::test]
    async fn test_month_uses_five_day_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let (s, e) = day_window(date(2024, 2, 15), 5);
        let source = Arc::new(ScriptedSource::default().with_historical(s, e, Scripted::Price(9.5)));
        let cache = Arc::new(MemoryCache::default());
        let svc = PriceHistoryService::new(source, cache);

        let points = svc.history("0xAAA", "base", TimeRange::OneMonth, now).await.unwrap();
        let dates: Vec<_> = points.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 2, 10), date(2024, 2, 15), date(2024, 2, 20), date(2024, 2, 25), date(2024, 3, 1), date(2024, 3, 6)]
        );
        assert_eq!(points[1].price, Some(9.5));
    }

    #[tokio::test]
    async fn test_unconfigured_source_rejected_on_miss() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let source = Arc::new(ScriptedSource::default());
        source.unconfigured.store(true, Ordering::SeqCst);
        let svc = PriceHistoryService::new(source.clone(), Arc::new(MemoryCache::default()));

        let err = svc.history("0xAAA", "base", TimeRange::OneWeek, now).await.unwrap_err();
        assert!(matches!(err, PriceError::Configuration(_)));
        assert_eq!(source.upstream_calls(), 0);
    }
}

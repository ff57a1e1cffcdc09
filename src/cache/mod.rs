//! Key-value cache boundary

pub mod redis_cache;

use async_trait::async_trait;
use std::time::Duration;

use crate::utils::StoreError;

pub use redis_cache::{connect_redis, RedisCache};

/// Cache entries live for 24 hours
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// get/set-with-TTL store. Last writer wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::CacheStore;
use crate::utils::StoreError;

/// Redis-backed cache. The connection manager reconnects on its own and is
/// cheap to clone per command.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

/// Open a managed Redis connection, shared by the cache and the job queue
pub async fn connect_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let client = redis::Client::open(redis_url)?;
    Ok(ConnectionManager::new(client).await?)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }
}

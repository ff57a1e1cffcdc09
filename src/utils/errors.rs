use thiserror::Error;

use crate::api::ApiError;

/// Failures of the cache, record store or job queue
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by on-demand lookups. Missing data is never an error.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("Price source unreachable: {0}")]
    UpstreamUnavailable(String),
}

/// Errors that fail a backfill delivery and hand it back to the queue
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("{0}")]
    Configuration(String),
    #[error("Genesis discovery failed: {0}")]
    Discovery(#[source] ApiError),
    #[error("Failed to persist price record: {0}")]
    Persistence(#[from] StoreError),
    #[error("Backfill interrupted by shutdown")]
    Interrupted,
}

/// Extract clean error message from database error strings
///
/// Removes technical error codes and prefixes like:
/// "error returned from database: 1062 (23000): Duplicate entry"
///
/// Returns only the meaningful error message:
/// "Duplicate entry"
pub fn extract_clean_error(error_msg: &str) -> String {
    if error_msg.contains("error returned from database:") {
        // Everything after the last ": " is the actual message
        if let Some(last_colon) = error_msg.rfind(": ") {
            error_msg[last_colon + 2..].trim().to_string()
        } else {
            error_msg.to_string()
        }
    } else {
        error_msg.to_string()
    }
}

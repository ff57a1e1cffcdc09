//! Upstream price source boundary

pub mod alchemy;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use alchemy::{AlchemyClient, ApiError};

/// Pricing API keyed by (token address, logical network name)
///
/// `Ok(None)` means the call succeeded but the source has no data point;
/// callers treat that as a normal outcome, not a failure.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Whether credentials are present. When false no call may be attempted.
    fn is_configured(&self) -> bool {
        true
    }

    /// Price observed inside `[start, end]`
    async fn historical_price(
        &self,
        address: &str,
        network: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, ApiError>;

    async fn current_price(&self, address: &str, network: &str) -> Result<Option<f64>, ApiError>;

    /// Block timestamp of the token's earliest on-chain transfer
    async fn earliest_transfer(&self, address: &str, network: &str) -> Result<DateTime<Utc>, ApiError>;
}

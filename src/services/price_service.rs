use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, PriceSource};
use crate::cache::{CacheStore, CACHE_TTL};
use crate::models::{CacheEntry, PriceMethod, PriceQuote};
use crate::services::cache_key::{build_key, CacheInstant};
use crate::services::interpolation::{interpolate, is_degenerate};
use crate::utils::PriceError;

/// Width of the window searched for a direct historical hit
const POINT_WINDOW_SECS: i64 = 60;
/// Distance of each bracketing price from the target instant
const BRACKET_SECS: i64 = 24 * 60 * 60;

/// Cache-aside point-in-time price lookup
pub struct PriceLookupService {
    source: Arc<dyn PriceSource>,
    cache: Arc<dyn CacheStore>,
}

impl PriceLookupService {
    pub fn new(source: Arc<dyn PriceSource>, cache: Arc<dyn CacheStore>) -> Self {
        Self { source, cache }
    }

    /// Resolve the current price and the price at `at_time` (unix seconds).
    ///
    /// Missing data never fails the lookup; the quote's `method` says how the
    /// historical price was obtained. Errors are reserved for bad input,
    /// missing credentials and a source that cannot be reached at all.
    pub async fn lookup(
        &self,
        token_address: &str,
        network: &str,
        at_time: i64,
    ) -> Result<PriceQuote, PriceError> {
        if token_address.trim().is_empty() || network.trim().is_empty() {
            return Err(PriceError::Validation(
                "coinId, network, and startTime are required".to_string(),
            ));
        }
        let at = Utc
            .timestamp_opt(at_time, 0)
            .single()
            .filter(|_| at_time > 0)
            .ok_or_else(|| PriceError::Validation(format!("Invalid startTime: {}", at_time)))?;
        // Every window derived from `at` must stay representable
        let point_end = at
            .checked_add_signed(Duration::seconds(BRACKET_SECS))
            .and_then(|_| at.checked_add_signed(Duration::seconds(POINT_WINDOW_SECS)))
            .ok_or_else(|| PriceError::Validation(format!("startTime out of range: {}", at_time)))?;

        let cache_key = build_key(token_address, network, CacheInstant::Unix(at_time));
        if let Some(quote) = self.read_cache(&cache_key).await {
            debug!("📦 Cache HIT {}", cache_key);
            return Ok(quote);
        }
        debug!("Cache MISS {}", cache_key);

        if !self.source.is_configured() {
            return Err(PriceError::Configuration("Missing Alchemy API key.".to_string()));
        }

        // Independent reads, neither may fail the other
        let (history, current) = tokio::join!(
            self.source.historical_price(
                token_address,
                network,
                at,
                point_end
            ),
            self.source.current_price(token_address, network),
        );

        if let (Err(h), Err(c)) = (&history, &current) {
            if h.is_unreachable() && c.is_unreachable() {
                return Err(PriceError::UpstreamUnavailable(h.to_string()));
            }
        }

        let history = tolerate("historical", history);
        let current = tolerate("current", current);

        let quote = match history {
            Some(price) => PriceQuote {
                current_price: current,
                history_price: Some(price),
                method: PriceMethod::Alchemy,
                low_confidence: false,
            },
            None => {
                warn!(
                    "Historical price missing for {} on {} at {}, attempting interpolation",
                    token_address, network, at_time
                );
                match self.interpolate_at(token_address, network, at).await {
                    Some((price, low_confidence)) => PriceQuote {
                        current_price: current,
                        history_price: Some(price),
                        method: PriceMethod::Interpolation,
                        low_confidence,
                    },
                    None => PriceQuote {
                        current_price: current,
                        history_price: current,
                        method: if current.is_some() {
                            PriceMethod::CurrentFallback
                        } else {
                            PriceMethod::None
                        },
                        low_confidence: false,
                    },
                }
            }
        };

        info!(
            "Resolved {} on {} at {}: history={:?} current={:?} via {}",
            token_address, network, at_time, quote.history_price, quote.current_price, quote.method
        );

        if quote.has_any_price() {
            self.write_cache(&cache_key, &quote).await;
        }

        Ok(quote)
    }

    /// Estimate from the day before and the day after. `None` when either
    /// side is unavailable. The flag marks a degenerate bracket.
    async fn interpolate_at(
        &self,
        token_address: &str,
        network: &str,
        at: DateTime<Utc>,
    ) -> Option<(f64, bool)> {
        let bracket = Duration::seconds(BRACKET_SECS);
        let (Some(before_at), Some(after_at)) = (at.checked_sub_signed(bracket), at.checked_add_signed(bracket)) else {
            warn!("Bracketing window around {} is out of range", at);
            return None;
        };

        let (before, after) = tokio::join!(
            self.source.historical_price(token_address, network, before_at, at),
            self.source.historical_price(token_address, network, at, after_at),
        );

        let before_price = tolerate("bracketing (before)", before)?;
        let after_price = tolerate("bracketing (after)", after)?;

        let (before_time, after_time) = (before_at.timestamp(), after_at.timestamp());
        let degenerate = is_degenerate(before_time, after_time);
        if degenerate {
            warn!("Bracketing instants coincide, interpolated price is low confidence");
        }

        let price = interpolate(at.timestamp(), before_time, after_time, before_price, after_price);
        debug!("🔄 Interpolated price: {}", price);
        Some((price, degenerate))
    }

    async fn read_cache(&self, key: &str) -> Option<PriceQuote> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry.into_cached_quote()),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, quote: &PriceQuote) {
        let payload = match serde_json::to_string(&CacheEntry::from(quote)) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not serialize cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &payload, CACHE_TTL).await {
            warn!("Error caching price data for {}: {}", key, e);
        }
    }
}

/// Treat a failed upstream read as a miss, logging the failure
pub(crate) fn tolerate(what: &str, result: Result<Option<f64>, ApiError>) -> Option<f64> {
    match result {
        Ok(price) => price,
        Err(e) => {
            warn!("Error fetching {} price: {}", what, e);
            None
        }
    }
}

//! Price quote and record models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a quote's historical price was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceMethod {
    #[serde(rename = "cache")]
    Cache,
    #[serde(rename = "alchemy")]
    Alchemy,
    #[serde(rename = "interpolation")]
    Interpolation,
    #[serde(rename = "current fallback")]
    CurrentFallback,
    #[serde(rename = "none")]
    None,
}

impl PriceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceMethod::Cache => "cache",
            PriceMethod::Alchemy => "alchemy",
            PriceMethod::Interpolation => "interpolation",
            PriceMethod::CurrentFallback => "current fallback",
            PriceMethod::None => "none",
        }
    }
}

impl std::fmt::Display for PriceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an on-demand lookup. Never stored as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub current_price: Option<f64>,
    pub history_price: Option<f64>,
    pub method: PriceMethod,
    /// Set when the historical price came from a degenerate interpolation interval
    pub low_confidence: bool,
}

impl PriceQuote {
    pub fn has_any_price(&self) -> bool {
        self.current_price.is_some() || self.history_price.is_some()
    }
}

/// Value stored under a cache key, serialized as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub current_price: Option<f64>,
    pub history_price: Option<f64>,
    pub method: PriceMethod,
}

impl From<&PriceQuote> for CacheEntry {
    fn from(quote: &PriceQuote) -> Self {
        Self {
            current_price: quote.current_price,
            history_price: quote.history_price,
            method: quote.method,
        }
    }
}

impl CacheEntry {
    /// A quote served from cache always reports `cache` as its method
    pub fn into_cached_quote(self) -> PriceQuote {
        PriceQuote {
            current_price: self.current_price,
            history_price: self.history_price,
            method: PriceMethod::Cache,
            low_confidence: false,
        }
    }
}

/// One durable daily price. Unique per (token_address, network, date).
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub token_address: String,
    pub network: String,
    pub date: NaiveDate,
    pub price: f64,
}

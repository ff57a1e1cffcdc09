use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request body for POST /tokens/historical
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPriceRequest {
    pub address: String,
    pub network: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub currency: &'static str,
}

/// Response from POST /tokens/historical
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalPriceResponse {
    #[serde(default)]
    pub data: Vec<PricePoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub value: Option<String>,
    pub timestamp: Option<String>,
}

/// Request body for POST /tokens/by-address
#[derive(Debug, Clone, Serialize)]
pub struct PricesByAddressRequest {
    pub addresses: Vec<AddressNetwork>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressNetwork {
    pub address: String,
    pub network: String,
}

/// Response from POST /tokens/by-address
#[derive(Debug, Clone, Deserialize)]
pub struct PricesByAddressResponse {
    #[serde(default)]
    pub data: Vec<TokenPrices>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrices {
    #[serde(default)]
    pub prices: Vec<TokenPrice>,
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub currency: Option<String>,
    pub value: Option<String>,
    pub last_updated_at: Option<String>,
}

/// JSON-RPC envelope for alchemy_getAssetTransfers
#[derive(Debug, Clone, Deserialize)]
pub struct AssetTransfersResponse {
    pub result: Option<AssetTransfersResult>,
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetTransfersResult {
    #[serde(default)]
    pub transfers: Vec<AssetTransfer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetTransfer {
    pub metadata: Option<TransferMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferMetadata {
    pub block_timestamp: Option<String>,
}

/// Error type for price source operations
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing Alchemy API key")]
    MissingApiKey,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Rate Limited. Retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    #[error("Price source unreachable: {0}")]
    Unreachable(String),
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
    #[error("No transfers found for token {0}")]
    NoTransfers(String),
    #[error("Invalid timestamp for token {token}: {value}")]
    InvalidTimestamp { token: String, value: String },
}

impl ApiError {
    /// True when the source could not be reached at all, as opposed to
    /// answering with an error or with no data
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Unreachable(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ApiError::Unreachable(e.to_string())
        } else if e.is_decode() {
            ApiError::DeserializationError(e.to_string())
        } else {
            ApiError::RequestError(format!("Request failed: {}", e))
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::models::{
    AddressNetwork, ApiError, AssetTransfersResponse, HistoricalPriceRequest,
    HistoricalPriceResponse, PricesByAddressRequest, PricesByAddressResponse,
};
use super::network::alchemy_network;
use crate::api::PriceSource;

/// Alchemy client for the Prices API and the asset-transfers JSON-RPC method
pub struct AlchemyClient {
    http_client: HttpClient,
    api_key: Option<String>,
    prices_base_url: String,
    /// RPC endpoint template, `{network}` is replaced with the Alchemy network
    rpc_url_template: String,
}

impl AlchemyClient {
    const DEFAULT_PRICES_BASE_URL: &'static str = "https://api.g.alchemy.com/prices/v1";
    const DEFAULT_RPC_URL_TEMPLATE: &'static str = "https://{network}.g.alchemy.com/v2";

    /// Create a new Alchemy client. A missing key is allowed here and reported
    /// per call, so lookups can still be served from cache.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        Self::with_base_urls(
            api_key,
            timeout,
            Self::DEFAULT_PRICES_BASE_URL.to_string(),
            Self::DEFAULT_RPC_URL_TEMPLATE.to_string(),
        )
    }

    /// Create a new client with custom endpoints (for testing)
    pub fn with_base_urls(
        api_key: Option<String>,
        timeout: Duration,
        prices_base_url: String,
        rpc_url_template: String,
    ) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::RequestError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            prices_base_url,
            rpc_url_template,
        })
    }

    fn api_key(&self) -> Result<&str, ApiError> {
        self.api_key.as_deref().ok_or(ApiError::MissingApiKey)
    }

    fn create_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Parse error response based on HTTP status code
    async fn handle_error_response(response: reqwest::Response) -> ApiError {
        let status_code = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let body_text = response.text().await.unwrap_or_default();

        match status_code {
            400 => {
                let message = serde_json::from_str::<serde_json::Value>(&body_text)
                    .ok()
                    .and_then(|v| {
                        v.get("message")
                            .or_else(|| v.pointer("/error/message"))
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                    })
                    .unwrap_or(body_text);
                ApiError::BadRequest(message)
            }
            401 | 403 => ApiError::Unauthorized(body_text),
            404 => ApiError::NotFound(body_text),
            429 => {
                warn!("Alchemy rate limited, retry after {:?}s", retry_after_secs);
                ApiError::RateLimited { retry_after_secs }
            }
            500..=599 => {
                warn!("Alchemy server error {}: {}", status_code, body_text);
                ApiError::ServerError(status_code, body_text)
            }
            _ => ApiError::HttpError(status_code, body_text),
        }
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .headers(Self::create_headers())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    /// POST /tokens/historical
    ///
    /// Returns the first price point inside `[start, end]`, or `None` when the
    /// window holds no data.
    pub async fn get_historical_price(
        &self,
        address: &str,
        network: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, ApiError> {
        let url = format!("{}/{}/tokens/historical", self.prices_base_url, self.api_key()?);
        let body = HistoricalPriceRequest {
            address: address.to_string(),
            network: alchemy_network(network),
            start_time: start,
            end_time: end,
            currency: "usd",
        };
        debug!("Requesting historical price: {:?}", body);

        let response: HistoricalPriceResponse = self.post_json(&url, &body).await?;
        parse_historical(response)
    }

    /// POST /tokens/by-address
    pub async fn get_current_price(&self, address: &str, network: &str) -> Result<Option<f64>, ApiError> {
        let url = format!("{}/{}/tokens/by-address", self.prices_base_url, self.api_key()?);
        let body = PricesByAddressRequest {
            addresses: vec![AddressNetwork {
                address: address.to_string(),
                network: alchemy_network(network),
            }],
        };
        debug!("Requesting current price: {:?}", body);

        let response: PricesByAddressResponse = self.post_json(&url, &body).await?;
        parse_current(response)
    }

    /// alchemy_getAssetTransfers, ascending from block 0, first ERC-20 transfer only
    pub async fn get_earliest_transfer(&self, address: &str, network: &str) -> Result<DateTime<Utc>, ApiError> {
        let base = self
            .rpc_url_template
            .replace("{network}", &alchemy_network(network));
        let url = format!("{}/{}", base, self.api_key()?);
        let body = json!({
            "id": 1,
            "jsonrpc": "2.0",
            "method": "alchemy_getAssetTransfers",
            "params": [{
                "fromBlock": "0x0",
                "contractAddresses": [address],
                "maxCount": "0x1",
                "order": "asc",
                "category": ["erc20"],
                "withMetadata": true,
            }],
        });

        let response: AssetTransfersResponse = self.post_json(&url, &body).await?;
        parse_earliest_transfer(address, response)
    }
}

fn parse_price_value(raw: &str) -> Result<f64, ApiError> {
    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::DeserializationError(format!("Price is not a number: {}", raw)))?;
    if !price.is_finite() {
        return Err(ApiError::DeserializationError(format!("Price is not finite: {}", raw)));
    }
    Ok(price)
}

fn parse_historical(response: HistoricalPriceResponse) -> Result<Option<f64>, ApiError> {
    match response.data.first().and_then(|p| p.value.as_deref()) {
        Some(raw) => parse_price_value(raw).map(Some),
        None => Ok(None),
    }
}

fn parse_current(response: PricesByAddressResponse) -> Result<Option<f64>, ApiError> {
    let Some(token) = response.data.first() else {
        return Ok(None);
    };
    if let Some(err) = &token.error {
        debug!("Alchemy returned no current price: {}", err);
    }
    match token.prices.first().and_then(|p| p.value.as_deref()) {
        Some(raw) => parse_price_value(raw).map(Some),
        None => Ok(None),
    }
}

fn parse_earliest_transfer(address: &str, response: AssetTransfersResponse) -> Result<DateTime<Utc>, ApiError> {
    if let Some(err) = response.error {
        return Err(ApiError::BadRequest(format!("JSON-RPC error {}: {}", err.code, err.message)));
    }

    let timestamp = response
        .result
        .and_then(|r| r.transfers.into_iter().next())
        .and_then(|t| t.metadata)
        .and_then(|m| m.block_timestamp)
        .ok_or_else(|| ApiError::NoTransfers(address.to_string()))?;

    DateTime::parse_from_rfc3339(&timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::InvalidTimestamp {
            token: address.to_string(),
            value: timestamp,
        })
}

#[async_trait]
impl PriceSource for AlchemyClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn historical_price(
        &self,
        address: &str,
        network: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, ApiError> {
        self.get_historical_price(address, network, start, end).await
    }

    async fn current_price(&self, address: &str, network: &str) -> Result<Option<f64>, ApiError> {
        self.get_current_price(address, network).await
    }

    async fn earliest_transfer(&self, address: &str, network: &str) -> Result<DateTime<Utc>, ApiError> {
        self.get_earliest_transfer(address, network).await
    }
}

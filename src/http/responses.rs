//! JSON response bodies and error-to-status mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{HistoryPoint, PriceMethod, PriceQuote};
use crate::utils::{extract_clean_error, PriceError, StoreError};

#[derive(Debug, Serialize)]
pub struct CurrentBody {
    pub price: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryBody {
    pub price: Option<f64>,
    pub method: PriceMethod,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub low_confidence: bool,
}

/// `/api/price` success body
#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub success: bool,
    #[serde(rename = "Current")]
    pub current: CurrentBody,
    #[serde(rename = "History")]
    pub history: HistoryBody,
}

impl From<PriceQuote> for PriceResponse {
    fn from(quote: PriceQuote) -> Self {
        Self {
            success: true,
            current: CurrentBody {
                price: quote.current_price,
            },
            history: HistoryBody {
                price: quote.history_price,
                method: quote.method,
                low_confidence: quote.low_confidence,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub method: PriceMethod,
}

/// `/api/historical-prices` success body
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub data: Vec<HistoryEntry>,
}

impl From<Vec<HistoryPoint>> for HistoryResponse {
    fn from(points: Vec<HistoryPoint>) -> Self {
        Self {
            success: true,
            data: points
                .into_iter()
                .map(|p| HistoryEntry {
                    date: p.date,
                    price: p.price,
                    method: p.method,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Failure answered to the client
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<String>,
}

impl ApiFailure {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            error: None,
        }
    }

    pub fn schedule_failed(err: &StoreError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Failed to schedule job.".to_string(),
            error: Some(extract_clean_error(&err.to_string())),
        }
    }
}

impl From<PriceError> for ApiFailure {
    fn from(err: PriceError) -> Self {
        let (status, message) = match err {
            PriceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            PriceError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            PriceError::UpstreamUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        Self {
            status,
            message,
            error: None,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = MessageResponse {
            success: false,
            message: self.message,
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}

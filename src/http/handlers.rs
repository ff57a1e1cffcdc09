use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use tracing::{debug, error, warn};

use super::responses::{ApiFailure, HistoryResponse, MessageResponse, PriceResponse};
use super::AppState;
use crate::models::{HistoryRequest, PriceRequest, ScheduleRequest};

fn rejected(rejection: JsonRejection) -> ApiFailure {
    warn!("Rejected request body: {}", rejection.body_text());
    ApiFailure::bad_request(rejection.body_text())
}

/// POST /api/price
pub async fn price(
    State(state): State<AppState>,
    body: Result<Json<PriceRequest>, JsonRejection>,
) -> Result<Json<PriceResponse>, ApiFailure> {
    let Json(body) = body.map_err(rejected)?;
    debug!("Price request: {:?}", body);
    let req = body.validate()?;

    let quote = state
        .lookup
        .lookup(&req.token_address, &req.network, req.at_time)
        .await?;
    Ok(Json(quote.into()))
}

/// POST /api/historical-prices
pub async fn historical_prices(
    State(state): State<AppState>,
    body: Result<Json<HistoryRequest>, JsonRejection>,
) -> Result<Json<HistoryResponse>, ApiFailure> {
    let Json(body) = body.map_err(rejected)?;
    debug!("History request: {:?}", body);
    let req = body.validate()?;

    let points = state
        .history
        .history(&req.token_address, &req.network, req.time_range, Utc::now())
        .await?;
    Ok(Json(points.into()))
}

/// POST /api/schedule
pub async fn schedule(
    State(state): State<AppState>,
    body: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    let Json(body) = body.map_err(rejected)?;
    let job = body.validate()?;

    let message = state.scheduler.schedule(job).await.map_err(|e| {
        error!("Failed to schedule job: {}", e);
        ApiFailure::schedule_failed(&e)
    })?;
    Ok(Json(MessageResponse {
        success: true,
        message,
        error: None,
    }))
}

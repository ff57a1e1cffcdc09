//! HTTP surface consumed by the UI

pub mod handlers;
pub mod responses;

use axum::{routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::services::{PriceHistoryService, PriceLookupService, ScheduleService};

/// Service handles shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<PriceLookupService>,
    pub history: Arc<PriceHistoryService>,
    pub scheduler: Arc<ScheduleService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/price", post(handlers::price))
        .route("/api/historical-prices", post(handlers::historical_prices))
        .route("/api/schedule", post(handlers::schedule))
        .with_state(state)
}

/// Serve until `shutdown` flips, letting in-flight requests finish
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("🌐 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            info!("Shutting down HTTP server");
        })
        .await
}

//! Control API for operators.
//!
//! - `GET /`, `GET /ping`, `GET /health`: keep-alive probes
//! - `POST /campaigns`: run a campaign and return its report
//! - `GET /campaigns/:initiator`: pending failures, if any
//! - `POST /campaigns/:initiator/retry`: re-send to pending failures
//! - `DELETE /campaigns/:initiator`: drop pending failures

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    cancel_campaign, create_campaign, get_campaign, health, home, ping, retry_campaign, AppState,
    CampaignRequest, CampaignResponse, HealthResponse,
};

/// Build the control API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/campaigns", post(create_campaign))
        .route(
            "/campaigns/:initiator",
            get(get_campaign).delete(cancel_campaign),
        )
        .route("/campaigns/:initiator/retry", post(retry_campaign))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

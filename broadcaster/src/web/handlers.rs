//! Control API handlers.
//!
//! Campaign runs are spawned onto their own task, so a client that disconnects
//! mid-run does not abandon the campaign half way through a batch.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::campaign::{
    BroadcastEngine, ButtonRows, CampaignReport, CampaignState, InitiatorId, Payload, RecipientId,
    RunState,
};
use crate::error::CampaignError;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<BroadcastEngine>,
}

impl AppState {
    pub fn new(config: Config, engine: BroadcastEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
        }
    }
}

// =============================================================================
// Keep-alive
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn home() -> &'static str {
    "Bot is alive"
}

pub async fn ping() -> &'static str {
    "pong"
}

// =============================================================================
// Campaigns
// =============================================================================

/// Body of `POST /campaigns`.
#[derive(Debug, Deserialize)]
pub struct CampaignRequest {
    pub initiator_id: InitiatorId,
    pub payload: Payload,
    #[serde(default)]
    pub buttons: ButtonRows,
    /// Explicit recipients; the recipient store is used when omitted
    #[serde(default)]
    pub recipients: Option<Vec<RecipientId>>,
}

/// Control API response.
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CampaignReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<CampaignState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_state: Option<RunState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CampaignResponse {
    fn status(status: &'static str) -> Self {
        Self {
            status,
            report: None,
            pending: None,
            run_state: None,
            error: None,
        }
    }

    fn with_report(status: &'static str, report: CampaignReport) -> Self {
        Self {
            report: Some(report),
            ..Self::status(status)
        }
    }

    fn with_error(status: &'static str, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::status(status)
        }
    }
}

type ApiResult = (StatusCode, Json<CampaignResponse>);

fn reply(code: StatusCode, body: CampaignResponse) -> ApiResult {
    (code, Json(body))
}

/// Check the bearer token and the initiator allow-list.
fn authorize(state: &AppState, headers: &HeaderMap, initiator: InitiatorId) -> Result<(), ApiResult> {
    let provided = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match (provided, state.config.operator_token.as_deref()) {
        (Some(provided), Some(expected)) if provided == expected => {
            // Auth passes
        }
        (None, Some(_)) => {
            warn!(initiator = initiator, "operator_auth_missing");
            return Err(reply(StatusCode::UNAUTHORIZED, CampaignResponse::status("unauthorized")));
        }
        (Some(_), Some(_)) => {
            warn!(initiator = initiator, "operator_auth_invalid");
            return Err(reply(StatusCode::UNAUTHORIZED, CampaignResponse::status("unauthorized")));
        }
        (_, None) => {
            // No token configured, allow through
        }
    }

    if !state.config.is_operator(initiator) {
        warn!(initiator = initiator, "operator_not_permitted");
        return Err(reply(StatusCode::FORBIDDEN, CampaignResponse::status("forbidden")));
    }
    Ok(())
}

fn error_reply(err: CampaignError) -> ApiResult {
    match err {
        CampaignError::NoPendingFailures(_) => {
            reply(StatusCode::NOT_FOUND, CampaignResponse::with_error("no_pending_failures", err))
        }
        CampaignError::CampaignInProgress(_) => {
            reply(StatusCode::CONFLICT, CampaignResponse::with_error("in_progress", err))
        }
        CampaignError::Store(_) if err.is_store_unavailable() => {
            error!(error = %err, "campaign_store_failed");
            reply(StatusCode::SERVICE_UNAVAILABLE, CampaignResponse::with_error("store_unavailable", err))
        }
        CampaignError::Store(_) => {
            error!(error = %err, "campaign_store_corrupt");
            reply(StatusCode::INTERNAL_SERVER_ERROR, CampaignResponse::with_error("store_corrupt", err))
        }
    }
}

/// Await a spawned campaign run and turn its outcome into a reply.
async fn finish_run(
    run: tokio::task::JoinHandle<Result<CampaignReport, CampaignError>>,
    status: &'static str,
) -> ApiResult {
    match run.await {
        Ok(Ok(report)) => reply(StatusCode::OK, CampaignResponse::with_report(status, report)),
        Ok(Err(err)) => error_reply(err),
        Err(e) => {
            error!(error = %e, "campaign_task_failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, CampaignResponse::with_error("error", e))
        }
    }
}

/// `POST /campaigns`: run a new campaign.
pub async fn create_campaign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CampaignRequest>,
) -> ApiResult {
    let initiator = request.initiator_id;
    if let Err(denied) = authorize(&state, &headers, initiator) {
        return denied;
    }

    info!(
        initiator = initiator,
        payload_type = request.payload.kind().as_str(),
        explicit_recipients = ?request.recipients.as_ref().map(Vec::len),
        button_rows = request.buttons.len(),
        "campaign_requested"
    );

    let engine = Arc::clone(&state.engine);
    let run = tokio::spawn(async move {
        match request.recipients {
            Some(recipients) => {
                engine
                    .run_campaign(initiator, request.payload, recipients, request.buttons)
                    .await
            }
            None => engine.broadcast(initiator, request.payload, request.buttons).await,
        }
    });

    finish_run(run, "completed").await
}

/// `GET /campaigns/:initiator`: pending failures and run state.
pub async fn get_campaign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(initiator): Path<InitiatorId>,
) -> ApiResult {
    if let Err(denied) = authorize(&state, &headers, initiator) {
        return denied;
    }

    let run_state = state.engine.run_state(initiator).await;
    match state.engine.pending_campaign(initiator).await {
        Ok(Some(pending)) => reply(
            StatusCode::OK,
            CampaignResponse {
                pending: Some(pending),
                run_state: Some(run_state),
                ..CampaignResponse::status("pending")
            },
        ),
        Ok(None) => reply(
            StatusCode::NOT_FOUND,
            CampaignResponse {
                run_state: Some(run_state),
                ..CampaignResponse::status("none")
            },
        ),
        Err(err) => error_reply(err),
    }
}

/// `POST /campaigns/:initiator/retry`: re-send to pending failures.
pub async fn retry_campaign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(initiator): Path<InitiatorId>,
) -> ApiResult {
    if let Err(denied) = authorize(&state, &headers, initiator) {
        return denied;
    }

    info!(initiator = initiator, "campaign_retry_requested");
    let engine = Arc::clone(&state.engine);
    let run = tokio::spawn(async move { engine.retry_campaign(initiator).await });

    finish_run(run, "completed").await
}

/// `DELETE /campaigns/:initiator`: drop pending failures.
pub async fn cancel_campaign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(initiator): Path<InitiatorId>,
) -> ApiResult {
    if let Err(denied) = authorize(&state, &headers, initiator) {
        return denied;
    }

    match state.engine.cancel_campaign(initiator).await {
        Ok(()) => reply(StatusCode::OK, CampaignResponse::status("cancelled")),
        Err(err) => error_reply(err),
    }
}

//! Route handler functions.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::ingest::parse_batch;
use crate::query::{run_query, QueryResponse, TrackingParams};
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ok: bool,
    /// Events appended to the log.
    pub received: usize,
    /// Events skipped because they could not be parsed.
    pub rejected: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub backend: String,
    pub total_events: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/tracking - ingest one tracker batch.
///
/// Takes the raw body so beacon deliveries without a JSON content type are
/// accepted too.
pub async fn track(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!(
                "Batch exceeds {} bytes",
                state.server.body_limit_bytes
            ))
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    let received_at = chrono::Utc::now().timestamp_millis();
    let parsed = parse_batch(&body, received_at).map_err(|e| {
        warn!(error = %e, "Rejected tracking batch");
        ApiError::from(e)
    })?;

    let outcome = state.store.add_events(&parsed.batch)?;
    debug!(
        session_id = %parsed.batch.session_id,
        received = outcome.accepted,
        rejected = parsed.rejected,
        "Tracking batch ingested"
    );

    Ok(Json(IngestResponse {
        ok: true,
        received: outcome.accepted,
        rejected: parsed.rejected,
    }))
}

/// GET /api/tracking?q=<query> - dashboard queries.
pub async fn query(
    State(state): State<AppState>,
    Query(params): Query<TrackingParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    Ok(Json(run_query(&state.store, &params)?))
}

/// GET /health - liveness and store size.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        backend: state.store.backend_name()?.to_string(),
        total_events: state.store.event_count()?,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}

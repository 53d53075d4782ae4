//! Scan workflow API handlers
//!
//! POST /scan/start, POST /scan/stop, POST /scan/reset, GET /scan/status,
//! POST /scan/stream_error

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::{ScanSession, ScanState},
    AppState,
};

/// Scan session snapshot returned by every scan endpoint
#[derive(Debug, Serialize)]
pub struct ScanStatusResponse {
    pub session_id: Uuid,
    pub state: ScanState,
    /// Consecutive failed start attempts
    pub attempts: u32,
    /// Automatic retry ceiling before a reset is required
    pub max_attempts: u32,
    /// Visual stream URL, keyed by the current session token
    pub stream_url: String,
    pub detected_text: Option<String>,
    pub last_error: Option<String>,
    /// Transient stream reconnection notice, if any
    pub stream_notice: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

fn status_response(state: &AppState, session: ScanSession) -> ScanStatusResponse {
    ScanStatusResponse {
        session_id: session.session_id,
        state: session.state,
        attempts: session.attempts,
        max_attempts: state.engine.max_attempts(),
        stream_url: state.engine.stream_url(session.stream_token),
        detected_text: session.detected_text,
        last_error: session.last_error,
        stream_notice: session.stream_notice,
        started_at: session.started_at,
    }
}

/// POST /scan/start
///
/// Begin a capture session. Returns 409 when one is already active; the
/// engine itself enforces mutual exclusion so concurrent starts cannot
/// race past a handler-level check.
pub async fn start_scan(State(state): State<AppState>) -> ApiResult<Json<ScanStatusResponse>> {
    let session = state.engine.start().await?;

    tracing::info!(
        session_id = %session.session_id,
        state = ?session.state,
        "Scan start requested"
    );

    Ok(Json(status_response(&state, session)))
}

/// POST /scan/stop
///
/// Stop the capture session. Idempotent: stopping while idle is harmless.
pub async fn stop_scan(State(state): State<AppState>) -> ApiResult<Json<ScanStatusResponse>> {
    let session = state.engine.stop().await;

    tracing::info!(session_id = %session.session_id, "Scan stop requested");

    Ok(Json(status_response(&state, session)))
}

/// POST /scan/reset
///
/// Clear the attempt counter and accumulated results after the automatic
/// retry ceiling has been reached.
pub async fn reset_scan(State(state): State<AppState>) -> ApiResult<Json<ScanStatusResponse>> {
    let session = state.engine.reset().await;

    tracing::info!(session_id = %session.session_id, "Scanner reset");

    Ok(Json(status_response(&state, session)))
}

/// GET /scan/status
pub async fn scan_status(State(state): State<AppState>) -> ApiResult<Json<ScanStatusResponse>> {
    let session = state.engine.snapshot().await;
    Ok(Json(status_response(&state, session)))
}

/// POST /scan/stream_error
///
/// Connection-loss callback from the visual stream element. Issues a fresh
/// stream token so the browser binds a distinct resource.
pub async fn stream_error(State(state): State<AppState>) -> ApiResult<Json<ScanStatusResponse>> {
    let session = state.engine.stream_interrupted().await;
    Ok(Json(status_response(&state, session)))
}

/// Build scan workflow routes
pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/scan/start", post(start_scan))
        .route("/scan/stop", post(stop_scan))
        .route("/scan/reset", post(reset_scan))
        .route("/scan/status", get(scan_status))
        .route("/scan/stream_error", post(stream_error))
}

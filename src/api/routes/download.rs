//! Session handlers: start, single URL, stop, status.
//!
//! Start requests answer as soon as validation passes; progress arrives on
//! `GET /events`.

use super::StopResponse;
use crate::api::AppState;
use crate::types::{SessionRequest, SingleUrlRequest};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

/// GET /download/status - Session state and running totals
#[utoipa::path(
    get,
    path = "/api/v1/download/status",
    tag = "download",
    responses(
        (status = 200, description = "Session snapshot", body = crate::types::SessionStatus)
    )
)]
pub async fn download_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.status().await))
}

/// POST /download/start - Start a batched session
#[utoipa::path(
    post,
    path = "/api/v1/download/start",
    tag = "download",
    request_body(content = SessionRequest, description = "Accounts and per-session overrides"),
    responses(
        (status = 202, description = "Session started"),
        (status = 400, description = "No usernames provided", body = crate::error::ApiError),
        (status = 409, description = "A session is already running", body = crate::error::ApiError),
        (status = 412, description = "Cookie slot for the platform is empty", body = crate::error::ApiError),
        (status = 503, description = "gallery-dl not found", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> impl IntoResponse {
    match state.downloader.start_session(request).await {
        // The session task is detached; its totals arrive as the `done` event
        Ok(_handle) => (StatusCode::ACCEPTED, Json(json!({"status": "started"}))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /download/single - Download one URL
#[utoipa::path(
    post,
    path = "/api/v1/download/single",
    tag = "download",
    request_body(content = SingleUrlRequest, description = "URL and tool overrides"),
    responses(
        (status = 202, description = "Download started"),
        (status = 400, description = "No URL provided", body = crate::error::ApiError),
        (status = 409, description = "A session is already running", body = crate::error::ApiError),
        (status = 412, description = "Cookie slot for the platform is empty", body = crate::error::ApiError),
        (status = 503, description = "gallery-dl not found", body = crate::error::ApiError)
    )
)]
pub async fn download_single(
    State(state): State<AppState>,
    Json(request): Json<SingleUrlRequest>,
) -> impl IntoResponse {
    match state.downloader.download_single_url(request).await {
        Ok(_handle) => (StatusCode::ACCEPTED, Json(json!({"status": "started"}))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /download/stop - Stop the running session
#[utoipa::path(
    post,
    path = "/api/v1/download/stop",
    tag = "download",
    responses(
        (status = 200, description = "Session stopped", body = StopResponse)
    )
)]
pub async fn stop_download(State(state): State<AppState>) -> impl IntoResponse {
    let terminated = state.downloader.stop().await;
    (StatusCode::OK, Json(StopResponse { terminated }))
}

//! Cookie slot handlers.

use super::{CookieUploadRequest, parse_platform};
use crate::api::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /cookies - Which cookie slots are filled
#[utoipa::path(
    get,
    path = "/api/v1/cookies",
    tag = "cookies",
    responses(
        (status = 200, description = "Cookie slot presence", body = crate::types::CookieStatus)
    )
)]
pub async fn cookie_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.cookie_status().await))
}

/// PUT /cookies/:platform - Store a cookie file
#[utoipa::path(
    put,
    path = "/api/v1/cookies/{platform}",
    tag = "cookies",
    params(("platform" = String, Path, description = "instagram or twitter")),
    request_body(content = CookieUploadRequest, description = "Cookie file content"),
    responses(
        (status = 204, description = "Cookie file stored"),
        (status = 400, description = "Unknown platform or empty content", body = crate::error::ApiError)
    )
)]
pub async fn save_cookies(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(request): Json<CookieUploadRequest>,
) -> impl IntoResponse {
    let platform = match parse_platform(&platform) {
        Ok(platform) => platform,
        Err(e) => return e.into_response(),
    };

    match state.downloader.save_cookies(platform, &request.content).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /cookies/:platform - Delete a cookie file
#[utoipa::path(
    delete,
    path = "/api/v1/cookies/{platform}",
    tag = "cookies",
    params(("platform" = String, Path, description = "instagram or twitter")),
    responses(
        (status = 204, description = "Cookie file deleted"),
        (status = 400, description = "Unknown platform", body = crate::error::ApiError),
        (status = 404, description = "No cookie file for the platform", body = crate::error::ApiError)
    )
)]
pub async fn delete_cookies(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> impl IntoResponse {
    let platform = match parse_platform(&platform) {
        Ok(platform) => platform,
        Err(e) => return e.into_response(),
    };

    match state.downloader.delete_cookies(platform).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

//! Archive handlers.

use super::{ArchiveAddRequest, ArchiveChangeResponse, parse_platform};
use crate::api::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /archive - Archived account names per platform
#[utoipa::path(
    get,
    path = "/api/v1/archive",
    tag = "archive",
    responses(
        (status = 200, description = "Names per platform in insertion order", body = crate::types::ArchiveListing),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_archive(State(state): State<AppState>) -> impl IntoResponse {
    match state.downloader.db.list_archive().await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /archive - Add names to a platform's archive
#[utoipa::path(
    post,
    path = "/api/v1/archive",
    tag = "archive",
    request_body(content = ArchiveAddRequest, description = "Platform and names to add"),
    responses(
        (status = 200, description = "Number of names newly added", body = ArchiveChangeResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn add_to_archive(
    State(state): State<AppState>,
    Json(request): Json<ArchiveAddRequest>,
) -> impl IntoResponse {
    match state
        .downloader
        .db
        .add_to_archive(request.platform, &request.usernames)
        .await
    {
        Ok(changed) => (StatusCode::OK, Json(ArchiveChangeResponse { changed })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /archive/:platform - Clear a platform's archive
#[utoipa::path(
    delete,
    path = "/api/v1/archive/{platform}",
    tag = "archive",
    params(("platform" = String, Path, description = "instagram or twitter")),
    responses(
        (status = 200, description = "Number of names removed", body = ArchiveChangeResponse),
        (status = 400, description = "Unknown platform", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn clear_archive(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> impl IntoResponse {
    let platform = match parse_platform(&platform) {
        Ok(platform) => platform,
        Err(e) => return e.into_response(),
    };

    match state.downloader.db.clear_archive(platform).await {
        Ok(changed) => (StatusCode::OK, Json(ArchiveChangeResponse { changed })).into_response(),
        Err(e) => e.into_response(),
    }
}

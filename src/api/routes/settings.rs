//! Settings handlers.

use crate::api::AppState;
use crate::config::SettingsUpdate;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /settings - Current settings
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Current settings", body = crate::config::Settings)
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.settings().await))
}

/// PATCH /settings - Merge a partial settings update
#[utoipa::path(
    patch,
    path = "/api/v1/settings",
    tag = "settings",
    request_body(content = SettingsUpdate, description = "Fields to change"),
    responses(
        (status = 200, description = "Updated settings", body = crate::config::Settings),
        (status = 500, description = "Settings file could not be written", body = crate::error::ApiError)
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> impl IntoResponse {
    match state.downloader.update_settings(update).await {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(e) => e.into_response(),
    }
}

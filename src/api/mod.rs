//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for driving download sessions,
//! managing cookie slots and the target archive, and streaming session events.

use crate::{BatchDownloader, Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Sessions
/// - `GET /download/status` - Session state and running totals
/// - `POST /download/start` - Start a batched session
/// - `POST /download/single` - Download one URL
/// - `POST /download/stop` - Stop the running session
///
/// ## Settings
/// - `GET /settings` - Current settings
/// - `PATCH /settings` - Merge a partial update
///
/// ## Cookies
/// - `GET /cookies` - Which cookie slots are filled
/// - `PUT /cookies/:platform` - Store a cookie file
/// - `DELETE /cookies/:platform` - Delete a cookie file
///
/// ## Archive
/// - `GET /archive` - Archived account names per platform
/// - `POST /archive` - Add names to a platform's archive
/// - `DELETE /archive/:platform` - Clear a platform's archive
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /status` - gallery-dl installation, settings and cookie presence
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(downloader: Arc<BatchDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        // Sessions
        .route("/download/status", get(routes::download_status))
        .route("/download/start", post(routes::start_download))
        .route("/download/single", post(routes::download_single))
        .route("/download/stop", post(routes::stop_download))
        // Settings
        .route(
            "/settings",
            get(routes::get_settings).patch(routes::update_settings),
        )
        // Cookies
        .route("/cookies", get(routes::cookie_status))
        .route(
            "/cookies/:platform",
            put(routes::save_cookies).delete(routes::delete_cookies),
        )
        // Archive
        .route(
            "/archive",
            get(routes::list_archive).post(routes::add_to_archive),
        )
        .route("/archive/:platform", delete(routes::clear_archive))
        // System
        .route("/health", get(routes::health_check))
        .route("/status", get(routes::system_status))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // SwaggerUi points at the prefixed /openapi.json served above
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are permitted.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops. The router is mounted under `/api/v1`.
///
/// # Example
///
/// ```no_run
/// use batch_dl::{BatchDownloader, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(BatchDownloader::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// batch_dl::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(downloader: Arc<BatchDownloader>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = Router::new().nest("/api/v1", create_router(downloader, config));

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

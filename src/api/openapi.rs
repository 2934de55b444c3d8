//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the batch-dl REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the batch-dl REST API
///
/// The document is served at:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "batch-dl REST API",
        version = "0.1.0",
        description = "REST API for running batched gallery-dl sessions against Instagram and X/Twitter accounts",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000/api/v1", description = "Local development server")
    ),
    paths(
        // Sessions
        crate::api::routes::download_status,
        crate::api::routes::start_download,
        crate::api::routes::download_single,
        crate::api::routes::stop_download,

        // Settings
        crate::api::routes::get_settings,
        crate::api::routes::update_settings,

        // Cookies
        crate::api::routes::cookie_status,
        crate::api::routes::save_cookies,
        crate::api::routes::delete_cookies,

        // Archive
        crate::api::routes::list_archive,
        crate::api::routes::add_to_archive,
        crate::api::routes::clear_archive,

        // System
        crate::api::routes::health_check,
        crate::api::routes::system_status,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::Platform,
        crate::types::ContentType,
        crate::types::LogKind,
        crate::types::AccountStatus,
        crate::types::BatchPhase,
        crate::types::SessionRequest,
        crate::types::SingleUrlRequest,
        crate::types::SessionStats,
        crate::types::SessionStatus,
        crate::types::SessionSummary,
        crate::types::TargetOutcome,
        crate::types::ToolStatus,
        crate::types::SystemStatus,
        crate::types::CookieStatus,
        crate::types::ArchiveListing,

        // Config types from config.rs
        crate::config::Settings,
        crate::config::SettingsUpdate,

        // API request/response types from routes
        crate::api::routes::CookieUploadRequest,
        crate::api::routes::ArchiveAddRequest,
        crate::api::routes::ArchiveChangeResponse,
        crate::api::routes::StopResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "download", description = "Sessions - Start batched or single-URL downloads, stop, and query progress"),
        (name = "settings", description = "Settings - Batch size, delays and gallery-dl options"),
        (name = "cookies", description = "Cookies - Per-platform cookie files used for authentication"),
        (name = "archive", description = "Archive - Account names that were already downloaded"),
        (name = "system", description = "System endpoints - Health checks, tool status, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;

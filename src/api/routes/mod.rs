//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`download`] - Session start/stop, single URLs, status
//! - [`settings`] - Persisted session settings
//! - [`cookies`] - Per-platform cookie slots
//! - [`archive`] - Previously downloaded account names
//! - [`system`] - Health, status, events, OpenAPI

use crate::error::{Error, Result};
use crate::types::Platform;
use serde::{Deserialize, Serialize};

mod archive;
mod cookies;
mod download;
mod settings;
mod system;

// Re-export all handlers so `routes::function_name` works from the router
pub use archive::*;
pub use cookies::*;
pub use download::*;
pub use settings::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for PUT /cookies/:platform
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CookieUploadRequest {
    /// Netscape-format cookie file content
    #[serde(default)]
    pub content: String,
}

/// Request body for POST /archive
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ArchiveAddRequest {
    /// Platform the names belong to
    pub platform: Platform,
    /// Account names to add
    #[serde(default)]
    pub usernames: Vec<String>,
}

/// Response for POST /archive and DELETE /archive/:platform
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ArchiveChangeResponse {
    /// Names inserted or removed
    pub changed: u64,
}

/// Response for POST /download/stop
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StopResponse {
    /// gallery-dl processes that were signalled
    pub terminated: usize,
}

/// Parse a `:platform` path segment
fn parse_platform(raw: &str) -> Result<Platform> {
    raw.parse().map_err(Error::Validation)
}

//! Application state for the API server

use crate::{BatchDownloader, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The downloader driving sessions, cookies and the archive
    pub downloader: Arc<BatchDownloader>,

    /// Static configuration (settings changes go through the downloader)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<BatchDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}

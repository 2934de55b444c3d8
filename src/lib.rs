//! # batch-dl
//!
//! Batch downloader for Instagram and X/Twitter accounts, driving gallery-dl.
//!
//! A session takes a list of account names, shuffles them and downloads them in
//! fixed-size concurrent batches with a cooldown in between. Every gallery-dl
//! process is supervised: its output is turned into structured [`Event`]s, an
//! account that only reports already-downloaded files is cut short, and a stop
//! request terminates every live process.
//!
//! ## Quick Start
//!
//! ```no_run
//! use batch_dl::{BatchDownloader, Config, SessionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BatchDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let session = downloader
//!         .start_session(SessionRequest {
//!             usernames: "nasa, @esa".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!     let summary = session.await?;
//!     println!("{} files from {} accounts", summary.total_files, summary.total_accounts);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Batch scheduling
pub mod batch;
/// gallery-dl command composition
pub mod command;
/// Configuration types
pub mod config;
/// Per-platform cookie files
pub mod cookies;
/// Database persistence layer
pub mod db;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// gallery-dl output interpretation
pub mod interpreter;
/// Process supervision
pub mod process;
/// gallery-dl discovery
pub mod tool;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use command::{CommandComposer, ComposeRequest, ComposeTarget, GalleryDlComposer, ToolCommand};
pub use config::{Config, Settings, SettingsUpdate};
pub use cookies::CookieStore;
pub use db::Database;
pub use downloader::BatchDownloader;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, SessionError, ToHttpStatus};
pub use types::{
    AccountStatus, ArchiveListing, ContentType, CookieStatus, Event, LogKind, Platform,
    SessionRequest, SessionStats, SessionStatus, SessionSummary, SingleUrlRequest, SystemStatus,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()`
/// method, which stops any running session and its gallery-dl processes.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use batch_dl::{BatchDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = BatchDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: BatchDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

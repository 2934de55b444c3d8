//! Core downloader implementation split into focused submodules.
//!
//! The `BatchDownloader` struct and its methods are organized by domain:
//! - [`session`] - Batched account sessions (start/stop/status)
//! - [`single`] - One-off single-URL downloads
//! - [`config_ops`] - Persisted settings, cookie slots and tool status
//! - [`lifecycle`] - Shutdown coordination

mod config_ops;
mod lifecycle;
mod session;
mod single;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use crate::command::{CommandComposer, GalleryDlComposer};
use crate::config::{Config, Settings};
use crate::cookies::CookieStore;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::interpreter::OutputRules;
use crate::process::{ProcessRegistry, SupervisorContext};
use crate::types::{Event, SessionStats};

/// Whether a session currently owns the downloader
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SessionPhase {
    Idle,
    Running,
}

/// Coordinator state guarded by one mutex
///
/// `generation` increases with every accepted session so a session that was
/// stopped and then superseded cannot overwrite its successor's state when it
/// finally winds down.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) phase: SessionPhase,
    pub(crate) generation: u64,
    pub(crate) cancel: CancellationToken,
    pub(crate) stats: SessionStats,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            generation: 0,
            cancel: CancellationToken::new(),
            stats: SessionStats::default(),
        }
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct BatchDownloader {
    /// Archive database (wrapped in Arc for sharing across tasks)
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Static configuration
    pub(crate) config: Arc<Config>,
    /// User-editable settings, persisted to the data directory
    pub(crate) settings: Arc<RwLock<Settings>>,
    /// Per-platform cookie files
    pub(crate) cookies: CookieStore,
    /// Builds gallery-dl invocations
    pub(crate) composer: Arc<dyn CommandComposer>,
    /// Compiled output classification rules
    pub(crate) rules: OutputRules,
    /// Live gallery-dl processes
    pub(crate) registry: ProcessRegistry,
    /// Session coordinator state
    pub(crate) session: Arc<Mutex<SessionState>>,
}

impl BatchDownloader {
    /// Create a new BatchDownloader instance
    ///
    /// This initializes all core components:
    /// - Creates the data and download directories
    /// - Opens/creates the SQLite archive database and runs migrations
    /// - Loads persisted settings (writing defaults on first start)
    /// - Sets up the event broadcast channel
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_composer(config, Arc::new(GalleryDlComposer::new())).await
    }

    /// Create a downloader that builds its commands with `composer`
    pub async fn with_composer(
        config: Config,
        composer: Arc<dyn CommandComposer>,
    ) -> Result<Self> {
        for dir in [&config.persistence.data_dir, config.download_dir()] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                ))
            })?;
        }

        let db = Database::new(&config.persistence.database_path).await?;
        let settings = config_ops::load_settings(&config).await?;
        let rules = OutputRules::new(&config.output)?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        tracing::info!(
            data_dir = %config.persistence.data_dir.display(),
            download_dir = %config.download_dir().display(),
            batch_size = settings.batch_size,
            "downloader initialized"
        );

        Ok(Self {
            db: Arc::new(db),
            event_tx,
            cookies: CookieStore::new(config.persistence.cookies_dir()),
            config: Arc::new(config),
            settings: Arc::new(RwLock::new(settings)),
            composer,
            rules,
            registry: ProcessRegistry::new(),
            session: Arc::new(Mutex::new(SessionState::default())),
        })
    }

    /// Subscribe to session events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// If a subscriber falls behind by more than 1000 events, it will receive a
    /// `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use batch_dl::{BatchDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = BatchDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{}: {:?}", event.name(), event);
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the static configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Supervisor dependencies for one session
    pub(crate) fn supervisor_context(&self, session_cancel: CancellationToken) -> SupervisorContext {
        SupervisorContext {
            composer: Arc::clone(&self.composer),
            rules: self.rules.clone(),
            registry: self.registry.clone(),
            event_tx: self.event_tx.clone(),
            kill_grace: self.config.output.kill_grace,
            session_cancel,
        }
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 127.0.0.1:3000).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}

//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;

use super::BatchDownloader;

impl BatchDownloader {
    /// Gracefully shut down the downloader
    ///
    /// Stops any running session (terminating its gallery-dl processes) and
    /// emits a `shutdown` event. The archive database closes when the last
    /// clone of the downloader is dropped.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        if self.is_running().await {
            let terminated = self.stop().await;
            tracing::info!(terminated, "Stopped running session");
        }

        let _ = self.event_tx.send(Event::Shutdown);

        tracing::info!(
            "Shutdown complete - database connections will close when downloader is dropped"
        );
        Ok(())
    }
}

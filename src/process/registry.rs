//! Registry of live tool processes

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Key of a registry entry
///
/// Handles are allocated by the registry rather than taken from the OS pid so
/// a recycled pid can never alias an older entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

/// A running process as seen by the registry
#[derive(Debug, Clone)]
pub struct LiveProcess {
    /// OS process id, if the platform reported one
    pub pid: Option<u32>,
    /// Target the process downloads
    pub target: String,
    cancel: CancellationToken,
}

/// Shared map of running processes to their termination tokens
#[derive(Clone, Debug, Default)]
pub struct ProcessRegistry {
    entries: Arc<Mutex<HashMap<HandleId, LiveProcess>>>,
    next_id: Arc<AtomicU64>,
}

impl ProcessRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly spawned process
    ///
    /// The returned token is cancelled when [`terminate_all`](Self::terminate_all)
    /// runs; the supervisor reacts by terminating the process.
    pub async fn register(
        &self,
        pid: Option<u32>,
        target: impl Into<String>,
    ) -> (HandleId, CancellationToken) {
        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        self.entries.lock().await.insert(
            id,
            LiveProcess {
                pid,
                target: target.into(),
                cancel: cancel.clone(),
            },
        );
        (id, cancel)
    }

    /// Forget a process after it exited
    ///
    /// Removing an unknown handle is a no-op, which happens when a stop already
    /// cleared the registry.
    pub async fn deregister(&self, id: HandleId) {
        self.entries.lock().await.remove(&id);
    }

    /// Ask every registered process to terminate and clear the registry
    ///
    /// Returns how many processes were signalled.
    pub async fn terminate_all(&self) -> usize {
        let drained: Vec<LiveProcess> = {
            let mut entries = self.entries.lock().await;
            entries.drain().map(|(_, process)| process).collect()
        };

        for process in &drained {
            tracing::debug!(
                account = %process.target,
                pid = ?process.pid,
                "terminating gallery-dl process"
            );
            process.cancel.cancel();
        }
        drained.len()
    }

    /// Number of live processes
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no process is running
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Snapshot of the live processes
    pub async fn snapshot(&self) -> Vec<LiveProcess> {
        self.entries.lock().await.values().cloned().collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_deregister_track_count() {
        let registry = ProcessRegistry::new();
        let (a, _) = registry.register(Some(10), "alice").await;
        let (b, _) = registry.register(Some(11), "bob").await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);

        registry.deregister(a).await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.snapshot().await[0].target, "bob");
    }

    #[tokio::test]
    async fn terminate_all_cancels_tokens_and_clears() {
        let registry = ProcessRegistry::new();
        let (_, first) = registry.register(Some(1), "a").await;
        let (_, second) = registry.register(None, "b").await;

        assert_eq!(registry.terminate_all().await, 2);
        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn deregister_after_terminate_all_is_harmless() {
        let registry = ProcessRegistry::new();
        let (id, _) = registry.register(Some(1), "a").await;
        registry.terminate_all().await;
        registry.deregister(id).await;
        assert_eq!(registry.terminate_all().await, 0);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let registry = ProcessRegistry::new();
        let clone = registry.clone();
        clone.register(None, "a").await;
        assert_eq!(registry.len().await, 1);
    }
}

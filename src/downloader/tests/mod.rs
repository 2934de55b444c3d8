#![cfg(unix)]

use super::*;
use crate::downloader::test_helpers::*;
use crate::types::{AccountStatus, BatchPhase, LogKind, Platform, SessionRequest};
use std::time::Duration;
use tokio::sync::broadcast;


/// Collect events until the session's `done` arrives
async fn collect_until_done(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let done = matches!(event, Event::Done { .. });
                    events.push(event);
                    if done {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await
    .expect("timed out waiting for done event");
    events
}

/// Events already buffered in `rx`
fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait until `n` gallery-dl processes are registered
async fn wait_for_processes(downloader: &BatchDownloader, n: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while downloader.registry.len().await < n {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("processes never registered");
}

fn request(usernames: &str) -> SessionRequest {
    SessionRequest {
        usernames: usernames.to_string(),
        ..Default::default()
    }
}

fn error_messages(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Error { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

fn has_log(events: &[Event], text: &str) -> bool {
    events
        .iter()
        .any(|e| matches!(e, Event::Log { message, .. } if message == text))
}

//! Batched execution of a session's targets
//!
//! Targets are split into contiguous groups. Each group runs fully concurrently,
//! and a cooldown separates consecutive groups so the remote site sees bursts of
//! at most `batch_size` sessions.

use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::types::{BatchPhase, Event, LogKind, Target, TargetOutcome};

/// Totals reported after each batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 1-based batch number
    pub batch_index: usize,
    /// Targets in the batch
    pub accounts: usize,
    /// Files downloaded in the batch
    pub files: u32,
    /// Posts downloaded in the batch
    pub posts: u32,
}

/// Totals across every batch that ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTotals {
    /// Files downloaded
    pub files: u32,
    /// Posts downloaded
    pub posts: u32,
    /// Batches that ran
    pub batches_run: usize,
}

/// Split targets into contiguous groups of at most `size`
///
/// A size of 0 is treated as 1.
pub fn partition(targets: Vec<Target>, size: usize) -> Vec<Vec<Target>> {
    let size = size.max(1);
    let mut batches = Vec::with_capacity(targets.len().div_ceil(size));
    let mut iter = targets.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }
    batches
}

/// Run `targets` batch by batch
///
/// `run_one` performs one target's download and must never fail; its outcome is
/// summed into the batch totals. `on_batch_done` is awaited after each batch.
/// Cancellation is checked before every batch and ends the cooldown early.
pub async fn run_batches<F, Fut, D, DFut>(
    targets: Vec<Target>,
    batch_size: usize,
    batch_delay: Duration,
    cancel: &CancellationToken,
    event_tx: &broadcast::Sender<Event>,
    mut run_one: F,
    mut on_batch_done: D,
) -> BatchTotals
where
    F: FnMut(Target) -> Fut,
    Fut: Future<Output = TargetOutcome>,
    D: FnMut(BatchReport) -> DFut,
    DFut: Future<Output = ()>,
{
    let emit = |event: Event| {
        event_tx.send(event).ok();
    };

    let batches = partition(targets, batch_size);
    let total_batches = batches.len();
    let mut totals = BatchTotals::default();

    for (i, batch) in batches.into_iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(batch_index = i + 1, "session cancelled, skipping remaining batches");
            break;
        }

        let batch_index = i + 1;
        let names: Vec<String> = batch.iter().map(|t| t.name.clone()).collect();
        tracing::info!(batch_index, total_batches, accounts = names.len(), "starting batch");

        emit(Event::Batch {
            phase: BatchPhase::Start,
            batch_index,
            total_batches,
            targets: names.clone(),
            files: None,
            posts: None,
        });
        let tagged = names
            .iter()
            .map(|n| format!("@{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        emit(Event::log(
            LogKind::Batch,
            format!("--- Batch {batch_index}/{total_batches}: {tagged} ---"),
        ));

        let accounts = batch.len();
        let outcomes = join_all(batch.into_iter().map(&mut run_one)).await;
        let files = outcomes.iter().map(|o| o.new_files).sum::<u32>();
        let posts = outcomes.iter().map(|o| o.new_posts).sum::<u32>();

        emit(Event::Batch {
            phase: BatchPhase::Done,
            batch_index,
            total_batches,
            targets: Vec::new(),
            files: Some(files),
            posts: Some(posts),
        });

        totals.files += files;
        totals.posts += posts;
        totals.batches_run += 1;
        on_batch_done(BatchReport {
            batch_index,
            accounts,
            files,
            posts,
        })
        .await;

        if batch_index < total_batches && !cancel.is_cancelled() {
            emit(Event::log(
                LogKind::Info,
                format!(
                    "Waiting {}s before next batch...",
                    batch_delay.as_millis() as f64 / 1000.0
                ),
            ));
            tokio::select! {
                _ = tokio::time::sleep(batch_delay) => {}
                _ = cancel.cancelled() => {
                    tracing::debug!(batch_index, "cooldown interrupted");
                }
            }
        }
    }

    totals
}

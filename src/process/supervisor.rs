//! Per-target process supervision
//!
//! [`run_target`] owns one gallery-dl process from spawn to exit. Both output
//! pipes are read by small forwarding tasks that push raw chunks into a single
//! channel; the supervising task consumes that channel, so a target's lines are
//! interpreted strictly in arrival order.
//!
//! Every failure is folded into the returned [`TargetOutcome`]; nothing here
//! returns an error to the batch scheduler.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::registry::ProcessRegistry;
use crate::command::{CommandComposer, ComposeRequest};
use crate::interpreter::{
    Directive, InterpretMode, LineAssembler, OutputInterpreter, OutputRules,
};
use crate::types::{AccountStatus, Event, LogKind, TargetOutcome};

/// Pipe read buffer size
const READ_BUF_SIZE: usize = 8 * 1024;

/// Chunks buffered between the pipe readers and the supervisor
const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// How long buffered output is still read once the process has exited
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Shared dependencies of every supervised download
#[derive(Clone)]
pub struct SupervisorContext {
    /// Builds the command for each target
    pub composer: Arc<dyn CommandComposer>,
    /// Output classification rules
    pub rules: OutputRules,
    /// Where live processes are recorded for `stop()`
    pub registry: ProcessRegistry,
    /// Event sink
    pub event_tx: broadcast::Sender<Event>,
    /// Time a terminated process gets before it is killed
    pub kill_grace: Duration,
    /// Session-wide token; cancelling it terminates every supervised process
    pub session_cancel: CancellationToken,
}

impl SupervisorContext {
    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// One download to supervise
#[derive(Debug, Clone)]
pub struct TargetJob {
    /// Target name used in events
    pub target: String,
    /// Log line emitted before the process starts
    pub announce: String,
    /// Command inputs
    pub request: ComposeRequest,
    /// Output interpretation mode
    pub mode: InterpretMode,
}

/// One-shot record of how a process ended
///
/// The supervisor may observe an ending more than once: the exit status while
/// output is still being read, the wait after both pipes close, or the
/// completion of a forced kill. The first observation decides the status.
#[derive(Debug, Default)]
pub struct ExitLatch {
    outcome: Option<AccountStatus>,
}

impl ExitLatch {
    /// Record an exit; returns `true` only for the first call
    pub fn settle(&mut self, status: AccountStatus) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(status);
        true
    }

    /// Settled status, if any
    pub fn outcome(&self) -> Option<AccountStatus> {
        self.outcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipe {
    Stdout,
    Stderr,
}

struct Chunk {
    pipe: Pipe,
    bytes: Vec<u8>,
}

/// Run one download to completion and report its outcome
///
/// Emits the announce log first and exactly one `account` event last.
pub async fn run_target(ctx: &SupervisorContext, job: TargetJob) -> TargetOutcome {
    ctx.emit(Event::log(LogKind::Info, job.announce.clone()));

    let command = ctx.composer.compose(&job.request);
    let mut interpreter = OutputInterpreter::new(ctx.rules.clone(), job.target.clone(), job.mode);

    let status = match command.to_command().spawn() {
        Ok(child) => supervise(ctx, &job.target, child, &mut interpreter).await,
        Err(e) => {
            tracing::warn!(
                account = %job.target,
                program = %command.program.display(),
                error = %e,
                "failed to spawn gallery-dl"
            );
            ctx.emit(Event::log(
                LogKind::Error,
                format!("Error: failed to start gallery-dl: {e} (@{})", job.target),
            ));
            AccountStatus::Error
        }
    };

    let progress = interpreter.progress();
    let outcome = TargetOutcome {
        target: job.target,
        new_files: progress.new_items,
        new_posts: progress.distinct_content(),
        status,
    };

    tracing::info!(
        account = %outcome.target,
        new_files = outcome.new_files,
        new_posts = outcome.new_posts,
        status = ?outcome.status,
        "account finished"
    );
    ctx.emit(Event::Account {
        target: outcome.target.clone(),
        new_files: outcome.new_files,
        new_posts: outcome.new_posts,
        status: outcome.status,
    });
    outcome
}

async fn supervise(
    ctx: &SupervisorContext,
    target: &str,
    mut child: Child,
    interpreter: &mut OutputInterpreter,
) -> AccountStatus {
    let pid = child.id();
    let (handle, cancel) = ctx.registry.register(pid, target).await;
    tracing::debug!(account = %target, pid = ?pid, "gallery-dl started");

    let (chunk_tx, mut chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_pipe(stdout, Pipe::Stdout, chunk_tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_pipe(stderr, Pipe::Stderr, chunk_tx.clone())));
    }
    drop(chunk_tx);

    let mut lines = PipeLines::default();
    let mut latch = ExitLatch::default();
    let mut terminate = false;

    'read: loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(account = %target, "stop requested");
                terminate = true;
                break 'read;
            }
            // Covers a stop that lands between spawn and registration
            _ = ctx.session_cancel.cancelled() => {
                tracing::debug!(account = %target, "session cancelled");
                terminate = true;
                break 'read;
            }
            exited = child.wait() => {
                latch.settle(status_of(target, exited));
                // Helpers that inherited the pipes may hold them open; only
                // output that is already on its way is read.
                let drain = async {
                    while let Some(chunk) = chunk_rx.recv().await {
                        feed_chunk(ctx, interpreter, &mut lines, chunk);
                    }
                };
                if tokio::time::timeout(EXIT_DRAIN_GRACE, drain).await.is_err() {
                    tracing::debug!(account = %target, "pipes still open after exit");
                }
                break 'read;
            }
            chunk = chunk_rx.recv() => {
                let Some(chunk) = chunk else {
                    break 'read;
                };
                if feed_chunk(ctx, interpreter, &mut lines, chunk) == Directive::Terminate {
                    terminate = true;
                    break 'read;
                }
            }
        }
    }

    if !terminate {
        lines.finish(ctx, interpreter);
    }
    // Pipe readers exit once their next send fails; abort covers readers
    // blocked on a pipe a helper process still holds.
    drop(chunk_rx);
    for reader in readers {
        reader.abort();
    }

    // Both pipes closed but the process is still alive
    if latch.outcome().is_none() && !terminate {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(account = %target, "stop requested after output closed");
                terminate = true;
            }
            _ = ctx.session_cancel.cancelled() => {
                tracing::debug!(account = %target, "session cancelled after output closed");
                terminate = true;
            }
            exited = child.wait() => {
                latch.settle(status_of(target, exited));
            }
        }
    }

    if terminate && latch.outcome().is_none() {
        send_terminate(&mut child, target);
        match tokio::time::timeout(ctx.kill_grace, child.wait()).await {
            Ok(exited) => {
                latch.settle(status_of(target, exited));
            }
            Err(_) => {
                tracing::warn!(
                    account = %target,
                    grace_secs = ctx.kill_grace.as_secs(),
                    "gallery-dl ignored SIGTERM, killing"
                );
                if let Err(e) = child.start_kill() {
                    tracing::debug!(account = %target, error = %e, "kill failed");
                }
                latch.settle(status_of(target, child.wait().await));
            }
        }
    }

    ctx.registry.deregister(handle).await;
    latch.outcome().unwrap_or(AccountStatus::Error)
}

/// Partial lines carried between chunks, per pipe
#[derive(Default)]
struct PipeLines {
    stdout: LineAssembler,
    stderr: LineAssembler,
}

impl PipeLines {
    /// Interpret unterminated trailing lines
    fn finish(&mut self, ctx: &SupervisorContext, interpreter: &mut OutputInterpreter) {
        if let Some(line) = self.stdout.finish() {
            feed_stdout(ctx, interpreter, &line);
        }
        if let Some(line) = self.stderr.finish() {
            emit_all(ctx, interpreter.interpret_stderr(&line));
        }
    }
}

fn feed_chunk(
    ctx: &SupervisorContext,
    interpreter: &mut OutputInterpreter,
    lines: &mut PipeLines,
    chunk: Chunk,
) -> Directive {
    match chunk.pipe {
        Pipe::Stdout => {
            for line in lines.stdout.push(&chunk.bytes) {
                if feed_stdout(ctx, interpreter, &line) == Directive::Terminate {
                    return Directive::Terminate;
                }
            }
        }
        Pipe::Stderr => {
            for line in lines.stderr.push(&chunk.bytes) {
                emit_all(ctx, interpreter.interpret_stderr(&line));
            }
        }
    }
    Directive::Continue
}

fn feed_stdout(
    ctx: &SupervisorContext,
    interpreter: &mut OutputInterpreter,
    line: &str,
) -> Directive {
    let interpretation = interpreter.interpret(line);
    emit_all(ctx, interpretation.events);
    interpretation.directive
}

fn emit_all(ctx: &SupervisorContext, events: Vec<Event>) {
    for event in events {
        ctx.emit(event);
    }
}

fn status_of(target: &str, result: std::io::Result<std::process::ExitStatus>) -> AccountStatus {
    match result {
        Ok(exit) => {
            tracing::debug!(account = %target, code = ?exit.code(), "gallery-dl exited");
            AccountStatus::from_exit_code(exit.code())
        }
        Err(e) => {
            tracing::warn!(account = %target, error = %e, "failed to wait for gallery-dl");
            AccountStatus::Error
        }
    }
}

async fn forward_pipe<R>(mut reader: R, pipe: Pipe, tx: mpsc::Sender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = Chunk {
                    pipe,
                    bytes: buf[..n].to_vec(),
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(?pipe, error = %e, "pipe read failed");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child, target: &str) {
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers. The pid belongs to a child that has
    // not been reaped yet (`child.id()` returns None after wait), so it cannot
    // refer to an unrelated process.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        tracing::debug!(
            account = %target,
            error = %std::io::Error::last_os_error(),
            "SIGTERM failed"
        );
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, target: &str) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(account = %target, error = %e, "terminate failed");
    }
}

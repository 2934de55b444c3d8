//! Batched account sessions - start, stop and status.

use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::batch::{self, BatchReport};
use crate::command::{ComposeRequest, ComposeTarget};
use crate::error::{Error, Result, SessionError};
use crate::interpreter::InterpretMode;
use crate::process::{TargetJob, run_target};
use crate::types::{
    ContentType, Event, LogKind, Platform, SessionRequest, SessionStats, SessionStatus,
    SessionSummary, Target, parse_targets,
};

use super::{BatchDownloader, SessionPhase};

/// Handle on an accepted session, held by the task driving it
pub(crate) struct ActiveSession {
    pub(crate) generation: u64,
    pub(crate) cancel: CancellationToken,
    pub(crate) started: Instant,
    pub(crate) total_accounts: usize,
}

/// Resolved parameters of one session
struct SessionPlan {
    platform: Platform,
    content_type: ContentType,
    program: PathBuf,
    cookies_file: PathBuf,
    download_dir: PathBuf,
    batch_size: usize,
    batch_delay: Duration,
    max_already_exists: u32,
    sleep_request: String,
    retries: u32,
    timeout: u32,
}

impl SessionPlan {
    fn job(&self, target: &Target, total: usize) -> TargetJob {
        TargetJob {
            target: target.name.clone(),
            announce: format!(
                "Starting @{} [{}/{}]",
                target.name, target.ordinal_index, total
            ),
            request: ComposeRequest {
                program: self.program.clone(),
                cookies_file: self.cookies_file.clone(),
                download_dir: self.download_dir.clone(),
                target: ComposeTarget::Account {
                    platform: self.platform,
                    username: target.name.clone(),
                    content_type: self.content_type,
                },
                sleep_request: self.sleep_request.clone(),
                retries: self.retries,
                timeout: self.timeout,
            },
            mode: InterpretMode::Account {
                max_already_exists: self.max_already_exists,
            },
        }
    }
}

impl BatchDownloader {
    /// Start a batched download session
    ///
    /// Validation happens before anything is spawned. A rejected request emits
    /// one `error` event and returns the matching [`SessionError`]; the session
    /// state is left untouched.
    ///
    /// On success the session runs in a background task whose handle resolves
    /// to the same totals the final `done` event carries.
    pub async fn start_session(
        &self,
        request: SessionRequest,
    ) -> Result<JoinHandle<SessionSummary>> {
        if self.is_running().await {
            return Err(self.reject(SessionError::AlreadyRunning));
        }

        let settings = self.settings().await;
        let Some(program) = self.resolve_tool(request.gallery_dl_path.clone()).await else {
            return Err(self.reject(SessionError::ToolNotFound));
        };

        let platform = request.platform;
        if !self.cookies.exists(platform).await {
            return Err(self.reject(SessionError::MissingCookies { platform }));
        }

        let mut names = parse_targets(&request.usernames);
        if names.is_empty() {
            return Err(self.reject(SessionError::NoTargets));
        }

        let plan = SessionPlan {
            platform,
            content_type: request.content_type,
            program,
            cookies_file: self.cookies.path_for(platform),
            download_dir: self.config.download_dir().clone(),
            batch_size: request.batch_size.unwrap_or(settings.batch_size).max(1),
            batch_delay: request
                .batch_delay
                .map(Duration::from_millis)
                .unwrap_or(settings.batch_delay),
            max_already_exists: request
                .max_already_exists
                .unwrap_or(settings.max_already_exists)
                .max(1),
            sleep_request: request.sleep_request.unwrap_or(settings.sleep_request),
            retries: request.retries.unwrap_or(settings.retries),
            timeout: request.timeout.unwrap_or(settings.timeout),
        };

        let active = self.begin(names.len()).await?;

        names.shuffle(&mut rand::thread_rng());
        let targets: Vec<Target> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Target {
                name,
                ordinal_index: i + 1,
            })
            .collect();

        tracing::info!(
            platform = %plan.platform,
            accounts = targets.len(),
            batch_size = plan.batch_size,
            generation = active.generation,
            "session started"
        );
        self.emit_event(Event::log(
            LogKind::Info,
            format!(
                "Starting {} session: {} accounts, batch size {}",
                plan.platform,
                targets.len(),
                plan.batch_size
            ),
        ));

        let downloader = self.clone();
        Ok(tokio::spawn(async move {
            downloader.run_session(active, plan, targets).await
        }))
    }

    async fn run_session(
        &self,
        active: ActiveSession,
        plan: SessionPlan,
        targets: Vec<Target>,
    ) -> SessionSummary {
        let ctx = self.supervisor_context(active.cancel.clone());
        let total = targets.len();

        let totals = batch::run_batches(
            targets,
            plan.batch_size,
            plan.batch_delay,
            &active.cancel,
            &self.event_tx,
            |target| {
                let ctx = ctx.clone();
                let job = plan.job(&target, total);
                async move { run_target(&ctx, job).await }
            },
            |report| self.record_batch(active.generation, report),
        )
        .await;

        self.finish(active, totals.files, totals.posts).await
    }

    /// Add a finished batch to the running totals
    async fn record_batch(&self, generation: u64, report: BatchReport) {
        let mut session = self.session.lock().await;
        if session.generation != generation {
            return;
        }
        session.stats.total_files += report.files;
        session.stats.total_posts += report.posts;
        session.stats.accounts_done += report.accounts;
    }

    /// Stop the running session
    ///
    /// Cancels the session, terminates every live gallery-dl process and
    /// returns to idle immediately; the session's task still emits its `done`
    /// event once the processes have exited. Returns how many processes were
    /// signalled. Safe to call when nothing is running.
    pub async fn stop(&self) -> usize {
        let cancel = {
            let mut session = self.session.lock().await;
            session.phase = SessionPhase::Idle;
            session.cancel.clone()
        };
        cancel.cancel();

        let terminated = self.registry.terminate_all().await;
        tracing::info!(terminated, "session stopped by user");
        self.emit_event(Event::log(LogKind::Info, "Download stopped by user."));
        terminated
    }

    /// Snapshot of the session state
    pub async fn status(&self) -> SessionStatus {
        let (running, stats) = {
            let session = self.session.lock().await;
            (session.phase == SessionPhase::Running, session.stats)
        };
        SessionStatus {
            running,
            active_processes: self.registry.len().await,
            stats,
        }
    }

    /// Whether a session currently holds the downloader
    pub async fn is_running(&self) -> bool {
        self.session.lock().await.phase == SessionPhase::Running
    }

    /// Claim the downloader for a new session
    ///
    /// The running check is repeated under the lock so two concurrent starts
    /// cannot both pass validation and run.
    pub(crate) async fn begin(&self, total_accounts: usize) -> Result<ActiveSession> {
        let mut session = self.session.lock().await;
        if session.phase == SessionPhase::Running {
            drop(session);
            return Err(self.reject(SessionError::AlreadyRunning));
        }

        session.phase = SessionPhase::Running;
        session.generation += 1;
        session.cancel = CancellationToken::new();
        session.stats = SessionStats {
            total_accounts,
            ..SessionStats::default()
        };

        Ok(ActiveSession {
            generation: session.generation,
            cancel: session.cancel.clone(),
            started: Instant::now(),
            total_accounts,
        })
    }

    /// Emit the `done` event and release the downloader
    pub(crate) async fn finish(
        &self,
        active: ActiveSession,
        total_files: u32,
        total_posts: u32,
    ) -> SessionSummary {
        let summary = SessionSummary {
            total_files,
            total_posts,
            total_accounts: active.total_accounts,
            elapsed_seconds: active.started.elapsed().as_secs_f64().round() as u64,
            stopped: active.cancel.is_cancelled(),
        };

        tracing::info!(
            generation = active.generation,
            total_files,
            total_posts,
            elapsed_seconds = summary.elapsed_seconds,
            stopped = summary.stopped,
            "session finished"
        );
        self.emit_event(summary.into());

        let mut session = self.session.lock().await;
        if session.generation == active.generation {
            session.phase = SessionPhase::Idle;
        }
        summary
    }

    /// Report a rejected start request to subscribers
    pub(crate) fn reject(&self, reason: SessionError) -> Error {
        tracing::warn!(reason = %reason, "download request rejected");
        self.emit_event(Event::Error {
            message: reason.to_string(),
        });
        reason.into()
    }
}

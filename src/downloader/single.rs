//! One-off single-URL downloads.

use tokio::task::JoinHandle;

use crate::command::{ComposeRequest, ComposeTarget};
use crate::error::{Result, SessionError};
use crate::interpreter::InterpretMode;
use crate::process::{TargetJob, run_target};
use crate::types::{Platform, SINGLE_URL_TARGET, SessionSummary, SingleUrlRequest};

use super::BatchDownloader;

const DEFAULT_SLEEP_REQUEST: &str = "1-2";
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT: u32 = 30;

impl BatchDownloader {
    /// Download one post, reel or profile URL
    ///
    /// Shares the session guard with [`start_session`](Self::start_session):
    /// it is rejected while a session runs, blocks new sessions while it runs,
    /// and ends with a `done` event counting one account. Every file the tool
    /// reports counts; there is no early stop.
    pub async fn download_single_url(
        &self,
        request: SingleUrlRequest,
    ) -> Result<JoinHandle<SessionSummary>> {
        if self.is_running().await {
            return Err(self.reject(SessionError::AlreadyRunning));
        }

        let Some(program) = self.resolve_tool(request.gallery_dl_path.clone()).await else {
            return Err(self.reject(SessionError::ToolNotFound));
        };

        let url = request.url.trim().to_string();
        if url.is_empty() {
            return Err(self.reject(SessionError::NoUrl));
        }

        let platform = Platform::from_url(&url);
        if !self.cookies.exists(platform).await {
            return Err(self.reject(SessionError::MissingCookies { platform }));
        }

        let job = TargetJob {
            target: SINGLE_URL_TARGET.to_string(),
            announce: format!("Downloading: {url}"),
            request: ComposeRequest {
                program,
                cookies_file: self.cookies.path_for(platform),
                download_dir: self.config.download_dir().clone(),
                target: ComposeTarget::Url(url.clone()),
                sleep_request: request
                    .sleep_request
                    .unwrap_or_else(|| DEFAULT_SLEEP_REQUEST.to_string()),
                retries: request.retries.unwrap_or(DEFAULT_RETRIES),
                timeout: request.timeout.unwrap_or(DEFAULT_TIMEOUT),
            },
            mode: InterpretMode::SingleUrl,
        };

        let active = self.begin(1).await?;
        tracing::info!(%url, %platform, generation = active.generation, "single URL download started");

        let downloader = self.clone();
        Ok(tokio::spawn(async move {
            let ctx = downloader.supervisor_context(active.cancel.clone());
            let outcome = run_target(&ctx, job).await;

            {
                let mut session = downloader.session.lock().await;
                if session.generation == active.generation {
                    session.stats.total_files = outcome.new_files;
                    session.stats.total_posts = outcome.new_posts;
                    session.stats.accounts_done = 1;
                }
            }

            downloader
                .finish(active, outcome.new_files, outcome.new_posts)
                .await
        }))
    }
}

//! Core types for batch-dl

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use utoipa::ToSchema;

use crate::config::Settings;

/// Pseudo-target name used for single-URL downloads
pub const SINGLE_URL_TARGET: &str = "single-url";

/// One account queued for download in a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Target {
    /// Account name without the leading `@`
    pub name: String,
    /// 1-based position after shuffling
    pub ordinal_index: usize,
}

/// Social platform a session downloads from
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// instagram.com
    #[default]
    Instagram,
    /// x.com (formerly twitter.com)
    Twitter,
}

impl Platform {
    /// All platforms, in display order
    pub const ALL: [Platform; 2] = [Platform::Instagram, Platform::Twitter];

    /// Lowercase platform name, also used as the cookie file stem and archive key
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
        }
    }

    /// Guess the platform a URL belongs to
    ///
    /// Anything that is not an X/Twitter URL is treated as Instagram.
    pub fn from_url(url: &str) -> Self {
        if url.contains("x.com") || url.contains("twitter.com") {
            Platform::Twitter
        } else {
            Platform::Instagram
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Platform::Instagram),
            "twitter" => Ok(Platform::Twitter),
            other => Err(format!(
                "Platform must be instagram or twitter, got '{other}'"
            )),
        }
    }
}

/// Which part of an Instagram profile to fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ContentType {
    /// Feed posts only
    #[serde(rename = "posts")]
    Posts,
    /// Reels only
    #[serde(rename = "reels")]
    Reels,
    /// Feed posts and reels
    #[default]
    #[serde(rename = "posts,reels")]
    PostsAndReels,
    /// Current stories
    #[serde(rename = "stories")]
    Stories,
    /// Story highlights
    #[serde(rename = "highlights")]
    Highlights,
}

/// Category of a `log` event, used by the browser for coloring
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Session progress
    Info,
    /// A file was downloaded
    Download,
    /// Already-downloaded content
    Skip,
    /// Tool or authorization failures
    Error,
    /// Batch boundaries
    Batch,
}

/// How a single target's download ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// The tool exited with code 0
    Completed,
    /// The tool was terminated early (up to date, or stopped)
    Skipped,
    /// The tool failed or could not be run
    Error,
}

impl AccountStatus {
    /// Map a process exit code to a status
    ///
    /// `None` means the process was ended by a signal; 143 is the shell
    /// convention for SIGTERM.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => AccountStatus::Completed,
            None | Some(143) => AccountStatus::Skipped,
            Some(_) => AccountStatus::Error,
        }
    }
}

/// Phase carried by `batch` events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchPhase {
    /// The batch is about to run
    Start,
    /// Every target in the batch has settled
    Done,
}

/// Event pushed to subscribers while a session runs
///
/// Serialized with an `event` tag carrying the SSE event name and camelCase
/// payload fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    /// Human-readable log line
    Log {
        /// Message text
        message: String,
        /// Log category
        #[serde(rename = "type")]
        kind: LogKind,
    },

    /// A new file was written
    #[serde(rename_all = "camelCase")]
    File {
        /// Target the file belongs to
        target: String,
        /// File name, truncated to 40 characters
        file_name: String,
        /// Upper-cased extension
        extension: String,
        /// New files for this target so far
        new_item_count: u32,
        /// Distinct posts seen for this target so far
        distinct_content_count: u32,
    },

    /// Periodic duplicate-streak progress
    #[serde(rename_all = "camelCase")]
    Skip {
        /// Target being skipped through
        target: String,
        /// Current streak length
        skip_count: u32,
        /// Streak length that ends the download
        threshold: u32,
    },

    /// The tool reported an authorization failure
    #[serde(rename_all = "camelCase")]
    CookieExpired {
        /// Affected target
        target: String,
        /// Raw stderr text
        message: String,
    },

    /// A target's download settled
    #[serde(rename_all = "camelCase")]
    Account {
        /// Target name
        target: String,
        /// Files downloaded
        new_files: u32,
        /// Distinct posts downloaded
        new_posts: u32,
        /// How the download ended
        status: AccountStatus,
    },

    /// Batch boundary
    #[serde(rename_all = "camelCase")]
    Batch {
        /// Start or done
        phase: BatchPhase,
        /// 1-based batch number
        batch_index: usize,
        /// Number of batches in the session
        total_batches: usize,
        /// Target names (start only)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        targets: Vec<String>,
        /// Files downloaded in the batch (done only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        files: Option<u32>,
        /// Posts downloaded in the batch (done only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        posts: Option<u32>,
    },

    /// Session finished, exactly once per accepted session
    #[serde(rename_all = "camelCase")]
    Done {
        /// Files across the session
        total_files: u32,
        /// Posts across the session
        total_posts: u32,
        /// Targets in the session
        total_accounts: usize,
        /// Wall-clock duration, rounded to whole seconds
        elapsed_seconds: u64,
        /// Whether the session was stopped by the user
        stopped: bool,
    },

    /// A start request was rejected
    Error {
        /// Reason shown to the user
        message: String,
    },

    /// Downloader is shutting down
    Shutdown,
}

impl Event {
    /// Convenience constructor for `log` events
    pub fn log(kind: LogKind, message: impl Into<String>) -> Self {
        Event::Log {
            message: message.into(),
            kind,
        }
    }

    /// SSE event name for this event
    pub fn name(&self) -> &'static str {
        match self {
            Event::Log { .. } => "log",
            Event::File { .. } => "file",
            Event::Skip { .. } => "skip",
            Event::CookieExpired { .. } => "cookie-expired",
            Event::Account { .. } => "account",
            Event::Batch { .. } => "batch",
            Event::Done { .. } => "done",
            Event::Error { .. } => "error",
            Event::Shutdown => "shutdown",
        }
    }
}

/// Running totals for the current (or last) session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Files downloaded so far
    pub total_files: u32,
    /// Distinct posts downloaded so far
    pub total_posts: u32,
    /// Targets whose batch has finished
    pub accounts_done: usize,
    /// Targets in the session
    pub total_accounts: usize,
}

/// Snapshot returned by the status query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether a session is running
    pub running: bool,
    /// Live tool processes
    pub active_processes: usize,
    /// Session totals
    pub stats: SessionStats,
}

/// Final totals of a finished session, mirrored by the `done` event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Files across the session
    pub total_files: u32,
    /// Posts across the session
    pub total_posts: u32,
    /// Targets in the session
    pub total_accounts: usize,
    /// Wall-clock duration, rounded to whole seconds
    pub elapsed_seconds: u64,
    /// Whether the session was stopped by the user
    pub stopped: bool,
}

impl From<SessionSummary> for Event {
    fn from(summary: SessionSummary) -> Self {
        Event::Done {
            total_files: summary.total_files,
            total_posts: summary.total_posts,
            total_accounts: summary.total_accounts,
            elapsed_seconds: summary.elapsed_seconds,
            stopped: summary.stopped,
        }
    }
}

/// Result of one supervised download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutcome {
    /// Target name
    pub target: String,
    /// Files downloaded
    pub new_files: u32,
    /// Distinct posts downloaded
    pub new_posts: u32,
    /// How the download ended
    pub status: AccountStatus,
}

/// Request to start a batched session
///
/// Optional fields override the persisted settings for this session only.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Raw account list, separated by newlines or commas
    #[serde(default)]
    pub usernames: String,
    /// Platform to download from (default: instagram)
    #[serde(default)]
    pub platform: Platform,
    /// Instagram content selection (default: posts,reels)
    #[serde(default)]
    pub content_type: ContentType,
    /// gallery-dl path override
    #[schema(value_type = Option<String>)]
    pub gallery_dl_path: Option<PathBuf>,
    /// Accounts per batch
    pub batch_size: Option<usize>,
    /// Duplicate streak threshold
    pub max_already_exists: Option<u32>,
    /// Cooldown between batches in milliseconds
    pub batch_delay: Option<u64>,
    /// gallery-dl sleep-request range
    pub sleep_request: Option<String>,
    /// gallery-dl retries
    pub retries: Option<u32>,
    /// gallery-dl timeout in seconds
    pub timeout: Option<u32>,
}

/// Request to download a single URL
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SingleUrlRequest {
    /// Post, reel or profile URL
    #[serde(default)]
    pub url: String,
    /// gallery-dl path override
    #[schema(value_type = Option<String>)]
    pub gallery_dl_path: Option<PathBuf>,
    /// gallery-dl sleep-request range (default: "1-2")
    pub sleep_request: Option<String>,
    /// gallery-dl retries (default: 3)
    pub retries: Option<u32>,
    /// gallery-dl timeout in seconds (default: 30)
    pub timeout: Option<u32>,
}

/// gallery-dl installation state reported by the status endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolStatus {
    /// Whether a gallery-dl executable was found
    pub installed: bool,
    /// Resolved executable path
    #[schema(value_type = Option<String>)]
    pub path: Option<PathBuf>,
    /// Output of `gallery-dl --version`
    pub version: Option<String>,
}

/// Overview returned by the status endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Whether a gallery-dl executable was found
    pub gallery_dl_installed: bool,
    /// Resolved executable path
    #[schema(value_type = Option<String>)]
    pub gallery_dl_path: Option<PathBuf>,
    /// Output of `gallery-dl --version`
    pub gallery_dl_version: Option<String>,
    /// Current settings
    pub settings: Settings,
    /// Cookie slot presence
    pub cookies: CookieStatus,
}

/// Which cookie slots are filled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CookieStatus {
    /// instagram.txt exists
    pub instagram: bool,
    /// twitter.txt exists
    pub twitter: bool,
}

/// Previously downloaded account names per platform
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArchiveListing {
    /// Instagram accounts, in insertion order
    pub instagram: Vec<String>,
    /// X/Twitter accounts, in insertion order
    pub twitter: Vec<String>,
}

/// Split raw user input into target names
///
/// Entries are separated by newlines or commas. Each entry is trimmed and loses
/// a single leading `@`; empty entries are dropped and repeated names keep only
/// their first occurrence.
pub fn parse_targets(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(['\n', ','])
        .map(|entry| {
            let trimmed = entry.trim();
            trimmed.strip_prefix('@').unwrap_or(trimmed).trim()
        })
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

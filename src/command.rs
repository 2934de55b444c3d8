//! gallery-dl command construction
//!
//! The [`CommandComposer`] trait is the seam between the session engine and the
//! concrete tool. The engine only needs a program and an argument vector; tests
//! substitute composers that point at fake scripts.

use rand::seq::SliceRandom;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::types::{ContentType, Platform};

/// Desktop user agents rotated per invocation
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

/// What a command should download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeTarget {
    /// A whole account
    Account {
        /// Platform the account lives on
        platform: Platform,
        /// Account name without `@`
        username: String,
        /// Instagram content selection (ignored for X/Twitter)
        content_type: ContentType,
    },
    /// A single post, reel or profile URL
    Url(String),
}

/// Everything needed to build one invocation
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    /// gallery-dl executable
    pub program: PathBuf,
    /// Netscape cookie file for the platform
    pub cookies_file: PathBuf,
    /// Root download directory
    pub download_dir: PathBuf,
    /// What to download
    pub target: ComposeTarget,
    /// `sleep-request` range, e.g. "2-4"
    pub sleep_request: String,
    /// Downloader retries
    pub retries: u32,
    /// Downloader timeout in seconds
    pub timeout: u32,
}

/// Program and argument vector, executed without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments in order
    pub args: Vec<OsString>,
}

impl ToolCommand {
    /// Build a tokio command with piped output
    ///
    /// The child is killed if its handle is dropped, so an aborted supervisor
    /// never leaks a process.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Whether an argument equals `value`
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }
}

/// Turns a download request into a concrete command
pub trait CommandComposer: Send + Sync {
    /// Build the command for `request`
    fn compose(&self, request: &ComposeRequest) -> ToolCommand;
}

/// Composer for gallery-dl's command-line interface
#[derive(Debug, Default, Clone, Copy)]
pub struct GalleryDlComposer;

impl GalleryDlComposer {
    /// Create the composer
    pub fn new() -> Self {
        Self
    }
}

impl CommandComposer for GalleryDlComposer {
    fn compose(&self, request: &ComposeRequest) -> ToolCommand {
        let mut args = ArgList::default();
        let mut cookies = OsString::from("--cookies=");
        cookies.push(request.cookies_file.as_os_str());
        args.push(cookies);
        args.push("--user-agent");
        args.push(random_user_agent());

        let url = match &request.target {
            ComposeTarget::Account {
                platform: Platform::Instagram,
                username,
                content_type,
            } => {
                let (url, dir_flag, dir) =
                    instagram_location(&request.download_dir, username, *content_type);
                args.push(dir_flag);
                args.push(dir);
                instagram_account_options(&mut args, *content_type, request);
                url
            }
            ComposeTarget::Account {
                platform: Platform::Twitter,
                username,
                ..
            } => {
                args.push("-d");
                args.push(request.download_dir.as_os_str());
                twitter_options(&mut args, request);
                format!("https://x.com/{username}/media")
            }
            ComposeTarget::Url(url) => {
                args.push("-D");
                args.push(request.download_dir.join("single-urls").as_os_str());
                single_url_options(&mut args, request);
                url.clone()
            }
        };

        args.push(url);
        ToolCommand {
            program: request.program.clone(),
            args: args.0,
        }
    }
}

#[derive(Default)]
struct ArgList(Vec<OsString>);

impl ArgList {
    fn push(&mut self, arg: impl Into<OsString>) {
        self.0.push(arg.into());
    }

    fn opt(&mut self, key: &str, value: impl std::fmt::Display) {
        self.0.push("-o".into());
        self.0.push(format!("{key}={value}").into());
    }
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

fn instagram_location(
    download_dir: &Path,
    username: &str,
    content_type: ContentType,
) -> (String, &'static str, PathBuf) {
    match content_type {
        ContentType::Reels => (
            format!("https://www.instagram.com/{username}/reels/"),
            "-d",
            download_dir.to_path_buf(),
        ),
        ContentType::Stories => (
            format!("https://www.instagram.com/stories/{username}/"),
            "-D",
            download_dir.join("stories").join(username),
        ),
        ContentType::Highlights => (
            format!("https://www.instagram.com/{username}/highlights/"),
            "-D",
            download_dir.join("highlights").join(username),
        ),
        ContentType::Posts | ContentType::PostsAndReels => (
            format!("https://www.instagram.com/{username}"),
            "-d",
            download_dir.to_path_buf(),
        ),
    }
}

fn instagram_account_options(args: &mut ArgList, content_type: ContentType, req: &ComposeRequest) {
    let include = match content_type {
        ContentType::Posts => "posts",
        ContentType::Reels => "reels",
        _ => "posts,reels",
    };
    args.opt("extractor.instagram.api", "rest");
    args.opt("extractor.instagram.graphql", "true");
    args.opt("extractor.instagram.web-api", "true");
    args.opt("extractor.instagram.previews", "false");
    args.opt("extractor.instagram.videos", "dash");
    args.opt("extractor.instagram.include", include);
    args.opt("extractor.instagram.video-format", "best");
    args.opt("extractor.instagram.image", "original");
    args.opt("extractor.instagram.image-filter", "");
    args.opt("extractor.instagram.sleep-request", &req.sleep_request);
    args.opt("extractor.instagram.youtubedl", "false");
    args.opt("downloader.retries", req.retries);
    args.opt("downloader.timeout", req.timeout);
    args.opt("downloader.http.adjust-extensions", "false");
}

fn twitter_options(args: &mut ArgList, req: &ComposeRequest) {
    args.opt("extractor.twitter.size", r#"["orig", "4096x4096"]"#);
    args.opt("extractor.twitter.videos", "dash");
    for flag in [
        "text-tweets",
        "conversations",
        "expand",
        "logout",
        "pinned",
        "quoted",
        "replies",
        "retweets",
    ] {
        args.opt(&format!("extractor.twitter.{flag}"), "false");
    }
    args.opt("extractor.twitter.twitpic", "true");
    args.opt("extractor.twitter.syndication", "false");
    args.opt("extractor.twitter.timeline.strategy", "tweets");
    args.opt("extractor.twitter.sleep-request", &req.sleep_request);
    args.opt("downloader.retries", req.retries);
    args.opt("downloader.timeout", req.timeout);
    args.opt("downloader.http.adjust-extensions", "false");
    args.opt(
        "downloader.http.headers",
        r#"{"Accept": "image/webp,image/avif,image/apng,image/svg+xml,image/*,*/*;q=0.8"}"#,
    );
    args.opt("downloader.http.verify", "true");
    args.opt("output.mode", "terminal");
    args.opt("output.log.level", "info");
    args.opt("output.log.format", "{name}: {message}");
}

fn single_url_options(args: &mut ArgList, req: &ComposeRequest) {
    args.opt("extractor.instagram.api", "rest");
    args.opt("extractor.instagram.graphql", "true");
    args.opt("extractor.instagram.previews", "false");
    args.opt("extractor.instagram.videos", "dash");
    args.opt("extractor.instagram.video-format", "best");
    args.opt("extractor.instagram.image", "original");
    args.opt("extractor.instagram.sleep-request", &req.sleep_request);
    args.opt("downloader.http.adjust-extensions", "false");
    args.opt("downloader.retries", req.retries);
    args.opt("downloader.timeout", req.timeout);
}

//! Classification of gallery-dl output into progress events
//!
//! gallery-dl has no machine-readable progress channel. It prints the path of
//! every file it writes to stdout, prefixes files it skipped because they
//! already exist with a marker character, and writes diagnostics to stderr.
//! This module turns those lines into [`Event`]s and decides when an account
//! looks fully mirrored so its process can be stopped early.
//!
//! Everything here is synchronous and side-effect free; the
//! [process supervisor](crate::process) owns the I/O.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use crate::config::OutputConfig;
use crate::error::{Error, Result};
use crate::types::{Event, LogKind};

/// Every this many consecutive duplicates a `skip` progress event is emitted
const SKIP_REPORT_INTERVAL: u32 = 10;

/// Maximum file name length carried by `file` events
const FILE_EVENT_NAME_LEN: usize = 40;

/// Maximum file name length shown in download log lines
const LOG_NAME_LEN: usize = 35;

/// Compiled matching rules built from [`OutputConfig`]
#[derive(Debug, Clone)]
pub struct OutputRules {
    exists_marker: char,
    path_fragments: Vec<String>,
    noise_patterns: Vec<String>,
    auth_failure: Option<Regex>,
}

impl OutputRules {
    /// Compile the rules
    ///
    /// Authorization-failure patterns are matched case-insensitively as literal
    /// substrings.
    pub fn new(config: &OutputConfig) -> Result<Self> {
        let auth_failure = if config.auth_failure_patterns.is_empty() {
            None
        } else {
            let alternation = config
                .auth_failure_patterns
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            let regex = RegexBuilder::new(&alternation)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Config {
                    message: format!("invalid authorization failure pattern: {e}"),
                    key: Some("output.auth_failure_patterns".to_string()),
                })?;
            Some(regex)
        };

        Ok(Self {
            exists_marker: config.exists_marker,
            path_fragments: config.path_fragments.clone(),
            noise_patterns: config.noise_patterns.clone(),
            auth_failure,
        })
    }

    /// Whether the line refers to the download or cache directory
    ///
    /// A fragment only counts at the start of the text or directly after a path
    /// separator, so `mydownloads/` does not match `downloads/`.
    pub fn has_path_fragment(&self, text: &str) -> bool {
        self.path_fragments.iter().any(|fragment| {
            !fragment.is_empty()
                && text.match_indices(fragment.as_str()).any(|(idx, _)| {
                    idx == 0 || text[..idx].ends_with('/') || text[..idx].ends_with('\\')
                })
        })
    }

    fn strip_marker<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.strip_prefix(self.exists_marker).map(str::trim_start)
    }

    fn is_noise(&self, line: &str) -> bool {
        self.noise_patterns.iter().any(|p| line.contains(p.as_str()))
    }

    fn is_auth_failure(&self, line: &str) -> bool {
        self.auth_failure
            .as_ref()
            .is_some_and(|regex| regex.is_match(line))
    }
}

/// Reassembles lines from arbitrarily split byte chunks
///
/// Bytes after the last newline are held back until the next chunk (or
/// [`finish`](Self::finish)) completes them, so a multi-byte character split
/// across reads is decoded correctly.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the complete, trimmed, non-empty lines it finished
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// Flush the trailing partial line, if any
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Per-target counters maintained while output is interpreted
#[derive(Debug, Default, Clone)]
pub struct TargetProgress {
    /// Files downloaded so far
    pub new_items: u32,
    /// Consecutive already-downloaded files since the last new file
    pub duplicate_streak: u32,
    content_ids: HashSet<String>,
    old_content_flagged: bool,
    terminated: bool,
}

impl TargetProgress {
    /// Number of distinct posts among the downloaded files
    pub fn distinct_content(&self) -> u32 {
        u32::try_from(self.content_ids.len()).unwrap_or(u32::MAX)
    }

    /// Whether the duplicate threshold has been reached
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// How output for a target is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretMode {
    /// Account download with early termination after a duplicate streak
    Account {
        /// Streak length that ends the download
        max_already_exists: u32,
    },
    /// Single URL: every unmarked line is a file, no early stop
    SingleUrl,
}

/// What the supervisor should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep reading
    Continue,
    /// Stop reading and terminate the process
    Terminate,
}

/// Events produced by one line plus the follow-up directive
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    /// Events to forward, in order
    pub events: Vec<Event>,
    /// Whether to keep the process running
    pub directive: Directive,
}

impl Interpretation {
    fn keep_going(events: Vec<Event>) -> Self {
        Self {
            events,
            directive: Directive::Continue,
        }
    }
}

/// Streaming classifier for one target's output
#[derive(Debug)]
pub struct OutputInterpreter {
    rules: OutputRules,
    target: String,
    mode: InterpretMode,
    progress: TargetProgress,
}

impl OutputInterpreter {
    /// Create an interpreter for `target`
    pub fn new(rules: OutputRules, target: impl Into<String>, mode: InterpretMode) -> Self {
        Self {
            rules,
            target: target.into(),
            mode,
            progress: TargetProgress::default(),
        }
    }

    /// Counters accumulated so far
    pub fn progress(&self) -> &TargetProgress {
        &self.progress
    }

    /// Classify one stdout line
    pub fn interpret(&mut self, line: &str) -> Interpretation {
        let line = line.trim();
        if line.is_empty() || self.progress.terminated {
            return Interpretation::keep_going(Vec::new());
        }

        match self.mode {
            InterpretMode::SingleUrl => {
                if self.rules.strip_marker(line).is_some() {
                    return Interpretation::keep_going(Vec::new());
                }
                let file_name = file_name_of(line);
                let mut events = vec![self.record_new_item(file_name)];
                events.push(Event::log(LogKind::Download, format!("Downloaded: {file_name}")));
                Interpretation::keep_going(events)
            }
            InterpretMode::Account { max_already_exists } => match self.rules.strip_marker(line) {
                None if self.rules.has_path_fragment(line) => {
                    Interpretation::keep_going(self.on_new_item(line))
                }
                Some(rest) if self.rules.has_path_fragment(rest) => {
                    self.on_duplicate(max_already_exists)
                }
                _ => Interpretation::keep_going(Vec::new()),
            },
        }
    }

    /// Classify one stderr line
    pub fn interpret_stderr(&self, line: &str) -> Vec<Event> {
        let line = line.trim();
        if line.is_empty() || self.rules.is_noise(line) {
            return Vec::new();
        }

        if self.rules.is_auth_failure(line) {
            return vec![
                Event::CookieExpired {
                    target: self.target.clone(),
                    message: line.to_string(),
                },
                Event::log(
                    LogKind::Error,
                    format!("COOKIE EXPIRED - @{}: {line}", self.target),
                ),
            ];
        }

        if line.contains("cookies") {
            return Vec::new();
        }

        let message = match self.mode {
            InterpretMode::Account { .. } => format!("Error: {line} (@{})", self.target),
            InterpretMode::SingleUrl => format!("Warning: {line}"),
        };
        vec![Event::log(LogKind::Error, message)]
    }

    fn on_new_item(&mut self, line: &str) -> Vec<Event> {
        self.progress.duplicate_streak = 0;
        self.progress.old_content_flagged = false;

        let file_name = file_name_of(line);
        let file_event = self.record_new_item(file_name);
        let extension = extension_of(file_name);
        let log = Event::log(
            LogKind::Download,
            format!(
                "[{}] {} - {}... (@{})",
                self.progress.new_items,
                extension,
                truncate_chars(file_name, LOG_NAME_LEN),
                self.target
            ),
        );
        vec![file_event, log]
    }

    fn record_new_item(&mut self, file_name: &str) -> Event {
        self.progress.new_items += 1;

        let content_id = extract_content_id(file_name);
        if !content_id.is_empty() {
            self.progress.content_ids.insert(content_id.to_string());
        }

        Event::File {
            target: self.target.clone(),
            file_name: truncate_chars(file_name, FILE_EVENT_NAME_LEN).to_string(),
            extension: extension_of(file_name),
            new_item_count: self.progress.new_items,
            distinct_content_count: self.progress.distinct_content(),
        }
    }

    fn on_duplicate(&mut self, max_already_exists: u32) -> Interpretation {
        self.progress.duplicate_streak += 1;
        let streak = self.progress.duplicate_streak;
        let mut events = Vec::new();

        if !self.progress.old_content_flagged {
            self.progress.old_content_flagged = true;
            events.push(Event::log(
                LogKind::Skip,
                format!("Old content detected for @{}...", self.target),
            ));
        }

        if streak % SKIP_REPORT_INTERVAL == 0 {
            events.push(Event::Skip {
                target: self.target.clone(),
                skip_count: streak,
                threshold: max_already_exists,
            });
        }

        if streak >= max_already_exists {
            self.progress.terminated = true;
            events.push(Event::log(
                LogKind::Skip,
                format!(
                    "@{} up to date ({max_already_exists} old files found)",
                    self.target
                ),
            ));
            return Interpretation {
                events,
                directive: Directive::Terminate,
            };
        }

        Interpretation::keep_going(events)
    }
}

/// Identifier of the post a file belongs to
///
/// Files of a multi-image post share a leading numeric id (`123_1.jpg`,
/// `123_2.jpg`). Without one, the file name minus its extension is used.
pub fn extract_content_id(file_name: &str) -> &str {
    let digits_end = file_name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(file_name.len());
    if digits_end > 0 {
        let next = file_name[digits_end..].chars().next();
        if matches!(next, None | Some('_') | Some('.')) {
            return &file_name[..digits_end];
        }
    }

    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => stem,
        _ => file_name,
    }
}

fn file_name_of(line: &str) -> &str {
    line.rsplit(['/', '\\']).next().unwrap_or(line)
}

fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_uppercase())
        .unwrap_or_default()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> OutputRules {
        OutputRules::new(&OutputConfig::default()).unwrap()
    }

    fn account(max: u32) -> OutputInterpreter {
        OutputInterpreter::new(
            rules(),
            "alice",
            InterpretMode::Account {
                max_already_exists: max,
            },
        )
    }

    fn log_messages(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Log { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    // --- content id ---

    #[test]
    fn content_id_uses_leading_digits() {
        assert_eq!(extract_content_id("123456789_1.jpg"), "123456789");
        assert_eq!(extract_content_id("123456789.mp4"), "123456789");
        assert_eq!(extract_content_id("123456789"), "123456789");
    }

    #[test]
    fn content_id_falls_back_to_stem() {
        assert_eq!(extract_content_id("no_number_here.mp4"), "no_number_here");
        assert_eq!(extract_content_id("123abc.jpg"), "123abc");
        assert_eq!(extract_content_id("archive.tar.gz"), "archive.tar");
        assert_eq!(extract_content_id("noext"), "noext");
    }

    // --- path fragments ---

    #[test]
    fn path_fragment_matches_at_start_or_after_separator() {
        let rules = rules();
        assert!(rules.has_path_fragment("downloads/instagram/alice/1.jpg"));
        assert!(rules.has_path_fragment("./downloads/instagram/alice/1.jpg"));
        assert!(rules.has_path_fragment("/home/u/.cache/gallery-dl/x"));
        assert!(!rules.has_path_fragment("mydownloads/1.jpg"));
        assert!(!rules.has_path_fragment("[instagram][info] no results"));
    }

    // --- line assembly ---

    #[test]
    fn assembler_carries_partial_lines_across_chunks() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.push(b"./downloads/a/1").is_empty());
        let lines = assembler.push(b"23_1.jpg\n./downl");
        assert_eq!(lines, vec!["./downloads/a/123_1.jpg"]);
        let lines = assembler.push(b"oads/a/456.jpg\n\n  \n");
        assert_eq!(lines, vec!["./downloads/a/456.jpg"]);
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn assembler_finish_returns_unterminated_tail() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"first\nsecond  ");
        assert_eq!(assembler.finish().as_deref(), Some("second"));
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn assembler_handles_utf8_split_across_chunks() {
        let mut assembler = LineAssembler::new();
        let text = "downloads/ü.jpg\n".as_bytes();
        let split = text.iter().position(|b| *b > 0x7f).unwrap() + 1;
        assert!(assembler.push(&text[..split]).is_empty());
        assert_eq!(assembler.push(&text[split..]), vec!["downloads/ü.jpg"]);
    }

    // --- new items ---

    #[test]
    fn new_item_emits_file_and_download_log() {
        let mut interp = account(10);
        let out = interp.interpret("./downloads/instagram/alice/123456789_1.jpg");

        assert_eq!(out.directive, Directive::Continue);
        assert_eq!(
            out.events[0],
            Event::File {
                target: "alice".into(),
                file_name: "123456789_1.jpg".into(),
                extension: "JPG".into(),
                new_item_count: 1,
                distinct_content_count: 1,
            }
        );
        assert_eq!(
            log_messages(&out.events),
            vec!["[1] JPG - 123456789_1.jpg... (@alice)"]
        );
    }

    #[test]
    fn files_of_one_post_count_once() {
        let mut interp = account(10);
        interp.interpret("./downloads/instagram/alice/111_1.jpg");
        interp.interpret("./downloads/instagram/alice/111_2.jpg");
        interp.interpret("./downloads/instagram/alice/222.mp4");

        assert_eq!(interp.progress().new_items, 3);
        assert_eq!(interp.progress().distinct_content(), 2);
    }

    #[test]
    fn long_file_names_are_truncated() {
        let mut interp = account(10);
        let name = format!("{}.jpg", "a".repeat(60));
        let out = interp.interpret(&format!("downloads/{name}"));

        match &out.events[0] {
            Event::File { file_name, .. } => assert_eq!(file_name.chars().count(), 40),
            other => panic!("expected file event, got {other:?}"),
        }
        let log = &log_messages(&out.events)[0];
        assert!(log.contains(&format!("{}...", "a".repeat(35))));
    }

    #[test]
    fn unrelated_lines_produce_nothing() {
        let mut interp = account(10);
        assert!(interp.interpret("").events.is_empty());
        assert!(interp.interpret("   ").events.is_empty());
        assert!(interp.interpret("[instagram][info] Fetching").events.is_empty());
        assert!(interp.interpret("# not a path").events.is_empty());
    }

    // --- duplicates ---

    #[test]
    fn first_duplicate_flags_old_content_once() {
        let mut interp = account(10);
        let first = interp.interpret("# ./downloads/instagram/alice/1.jpg");
        let second = interp.interpret("# ./downloads/instagram/alice/2.jpg");

        assert_eq!(
            log_messages(&first.events),
            vec!["Old content detected for @alice..."]
        );
        assert!(second.events.is_empty());
        assert_eq!(interp.progress().duplicate_streak, 2);
    }

    #[test]
    fn streak_reaching_threshold_terminates() {
        let mut interp = account(3);
        interp.interpret("# downloads/1.jpg");
        interp.interpret("# downloads/2.jpg");
        let out = interp.interpret("# downloads/3.jpg");

        assert_eq!(out.directive, Directive::Terminate);
        assert_eq!(
            log_messages(&out.events),
            vec!["@alice up to date (3 old files found)"]
        );
        assert!(interp.progress().is_terminated());

        let after = interp.interpret("./downloads/new.jpg");
        assert!(after.events.is_empty(), "lines after termination are ignored");
        assert_eq!(interp.progress().new_items, 0);
    }

    #[test]
    fn every_tenth_duplicate_reports_skip_progress() {
        let mut interp = account(25);
        let mut skips = Vec::new();
        for i in 1..=20 {
            let out = interp.interpret(&format!("# downloads/{i}.jpg"));
            skips.extend(out.events.into_iter().filter_map(|e| match e {
                Event::Skip {
                    skip_count,
                    threshold,
                    ..
                } => Some((skip_count, threshold)),
                _ => None,
            }));
        }
        assert_eq!(skips, vec![(10, 25), (20, 25)]);
    }

    #[test]
    fn threshold_of_ten_reports_skip_and_up_to_date_on_same_line() {
        let mut interp = account(10);
        for i in 1..10 {
            assert_eq!(
                interp.interpret(&format!("# downloads/{i}.jpg")).directive,
                Directive::Continue
            );
        }
        let out = interp.interpret("# downloads/10.jpg");
        assert_eq!(out.directive, Directive::Terminate);
        assert!(matches!(out.events[0], Event::Skip { skip_count: 10, .. }));
        assert_eq!(
            log_messages(&out.events),
            vec!["@alice up to date (10 old files found)"]
        );
    }

    #[test]
    fn new_item_resets_streak_and_rearms_old_content_log() {
        let mut interp = account(3);
        interp.interpret("# downloads/1.jpg");
        interp.interpret("# downloads/2.jpg");
        interp.interpret("downloads/3.jpg");
        assert_eq!(interp.progress().duplicate_streak, 0);

        let out = interp.interpret("# downloads/4.jpg");
        assert_eq!(
            log_messages(&out.events),
            vec!["Old content detected for @alice..."]
        );
        let out = interp.interpret("# downloads/5.jpg");
        assert_eq!(out.directive, Directive::Continue);
    }

    #[test]
    fn custom_marker_and_fragments_are_honored() {
        let config = OutputConfig {
            exists_marker: '!',
            path_fragments: vec!["media/".to_string()],
            ..Default::default()
        };
        let mut interp = OutputInterpreter::new(
            OutputRules::new(&config).unwrap(),
            "bob",
            InterpretMode::Account {
                max_already_exists: 1,
            },
        );

        assert!(interp.interpret("downloads/1.jpg").events.is_empty());
        assert_eq!(interp.interpret("/srv/media/1.jpg").events.len(), 2);
        assert_eq!(
            interp.interpret("! /srv/media/1.jpg").directive,
            Directive::Terminate
        );
    }

    // --- single URL ---

    #[test]
    fn single_url_counts_every_unmarked_line() {
        let mut interp = OutputInterpreter::new(rules(), "single-url", InterpretMode::SingleUrl);
        let out = interp.interpret("/tmp/elsewhere/987_1.jpg");
        assert_eq!(log_messages(&out.events), vec!["Downloaded: 987_1.jpg"]);

        interp.interpret("987_2.jpg");
        for _ in 0..20 {
            let skipped = interp.interpret("# downloads/old.jpg");
            assert!(skipped.events.is_empty());
            assert_eq!(skipped.directive, Directive::Continue);
        }
        assert_eq!(interp.progress().new_items, 2);
        assert_eq!(interp.progress().distinct_content(), 1);
    }

    // --- stderr ---

    #[test]
    fn stderr_noise_is_dropped() {
        let interp = account(10);
        assert!(
            interp
                .interpret_stderr("[download][info] Trying fallback URL #2")
                .is_empty()
        );
        assert!(interp.interpret_stderr("youtube_dl not installed").is_empty());
    }

    #[test]
    fn stderr_auth_failure_raises_cookie_expired() {
        let interp = account(10);
        let events = interp.interpret_stderr("[instagram][error] HTTP 401 Unauthorized");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "cookie-expired");
        assert_eq!(
            log_messages(&events),
            vec!["COOKIE EXPIRED - @alice: [instagram][error] HTTP 401 Unauthorized"]
        );
    }

    #[test]
    fn stderr_auth_failure_is_case_insensitive() {
        let interp = account(10);
        let events = interp.interpret_stderr("LoginRequired: redirected");
        assert_eq!(events[0].name(), "cookie-expired");
        let events = interp.interpret_stderr("Please wait a few minutes before you try again.");
        assert_eq!(events[0].name(), "cookie-expired");
    }

    #[test]
    fn stderr_other_lines_become_error_logs() {
        let interp = account(10);
        assert_eq!(
            log_messages(&interp.interpret_stderr("[instagram][error] 404 Not Found")),
            vec!["Error: [instagram][error] 404 Not Found (@alice)"]
        );
        assert!(
            interp
                .interpret_stderr("[warning] cookies file has no entries")
                .is_empty()
        );
    }

    #[test]
    fn stderr_in_single_url_mode_is_a_warning() {
        let interp = OutputInterpreter::new(rules(), "single-url", InterpretMode::SingleUrl);
        assert_eq!(
            log_messages(&interp.interpret_stderr("something odd")),
            vec!["Warning: something odd"]
        );
    }
}

//! Shared test helpers for creating BatchDownloader instances in tests.
//!
//! Process-level tests replace gallery-dl with small shell scripts. Scripts are
//! run as `/bin/sh <script>` so they never need the executable bit.

use crate::command::{CommandComposer, ComposeRequest, ComposeTarget, ToolCommand};
use crate::config::Config;
use crate::downloader::BatchDownloader;
use crate::types::Platform;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Config rooted in `root` with a fake tool path and no PATH search
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.data_dir = root.join("data");
    config.persistence.database_path = root.join("data").join("archive.db");
    config.persistence.download_dir = root.join("downloads");
    config.tools.gallery_dl_path = Some(PathBuf::from("/bin/sh"));
    config.tools.search_path = false;
    config.output.kill_grace = Duration::from_secs(2);
    config.settings.batch_delay = Duration::ZERO;
    config
}

/// Helper to create a test BatchDownloader backed by a [`ScriptComposer`].
/// Returns the downloader, the composer and the tempdir (which must be kept alive).
pub(crate) async fn create_scripted_downloader()
-> (BatchDownloader, Arc<ScriptComposer>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let composer = Arc::new(ScriptComposer::new(temp_dir.path().join("scripts")));
    let downloader =
        BatchDownloader::with_composer(test_config(temp_dir.path()), composer.clone())
            .await
            .unwrap();
    (downloader, composer, temp_dir)
}

/// Helper to create a test BatchDownloader instance.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader() -> (BatchDownloader, tempfile::TempDir) {
    let (downloader, _composer, temp_dir) = create_scripted_downloader().await;
    (downloader, temp_dir)
}

/// Fill the cookie slot for `platform`
pub(crate) async fn add_cookies(downloader: &BatchDownloader, platform: Platform) {
    downloader
        .save_cookies(platform, "# Netscape HTTP Cookie File\n")
        .await
        .unwrap();
}

/// Composer that runs a shell script per target instead of gallery-dl
///
/// Targets without a registered script run [`ScriptComposer::DEFAULT_SCRIPT`].
pub(crate) struct ScriptComposer {
    dir: PathBuf,
    default_script: PathBuf,
    scripts: Mutex<HashMap<String, PathBuf>>,
    invocations: Mutex<Vec<String>>,
}

impl ScriptComposer {
    /// Prints one new file and exits 0
    pub(crate) const DEFAULT_SCRIPT: &'static str = "echo \"downloads/x/1000_1.jpg\"\n";

    pub(crate) fn new(dir: PathBuf) -> Self {
        std::fs::create_dir_all(&dir).unwrap();
        let default_script = write_script(&dir, "default", Self::DEFAULT_SCRIPT);
        Self {
            dir,
            default_script,
            scripts: Mutex::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Register the script body run for `target` (account name or URL)
    pub(crate) fn script(&self, target: &str, body: &str) {
        let path = write_script(&self.dir, &sanitize(target), body);
        self.scripts
            .lock()
            .unwrap()
            .insert(target.to_string(), path);
    }

    /// Targets composed so far, in order
    pub(crate) fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    fn script_for(&self, target: &str) -> PathBuf {
        self.scripts
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .unwrap_or_else(|| self.default_script.clone())
    }
}

impl CommandComposer for ScriptComposer {
    fn compose(&self, request: &ComposeRequest) -> ToolCommand {
        let target = match &request.target {
            ComposeTarget::Account { username, .. } => username.clone(),
            ComposeTarget::Url(url) => url.clone(),
        };
        self.invocations.lock().unwrap().push(target.clone());
        ToolCommand {
            program: request.program.clone(),
            args: vec![self.script_for(&target).into_os_string()],
        }
    }
}

/// Write a shell script into `dir` and return its path
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(format!("{name}.sh"));
    std::fs::write(&path, body).unwrap();
    path
}

fn sanitize(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

//! Common test utilities for batch-dl integration tests
//!
//! gallery-dl is replaced by shell scripts run as `/bin/sh <script>`, one per
//! account, so no network access or real tool is needed.

use batch_dl::{CommandComposer, ComposeRequest, ComposeTarget, Config, ToolCommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config rooted in `root` with `/bin/sh` standing in for gallery-dl
pub fn test_config(root: &Path) -> Config {
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

/// Runs a per-account script instead of gallery-dl
///
/// Accounts without a script print one new file and exit 0.
pub struct FakeGalleryDl {
    scripts: HashMap<String, PathBuf>,
    fallback: PathBuf,
}

impl FakeGalleryDl {
    /// Write `scripts` (account name, script body) into `dir`
    pub fn new(dir: &Path, scripts: &[(&str, &str)]) -> Self {
        std::fs::create_dir_all(dir).unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.join(format!("{name}.sh"));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, body).unwrap();
            path
        };

        Self {
            scripts: scripts
                .iter()
                .map(|(name, body)| (name.to_string(), write(name, body)))
                .collect(),
            fallback: write("fallback", "echo downloads/fallback/1_1.jpg\n"),
        }
    }
}

impl CommandComposer for FakeGalleryDl {
    fn compose(&self, request: &ComposeRequest) -> ToolCommand {
        let script = match &request.target {
            ComposeTarget::Account { username, .. } => self.scripts.get(username),
            ComposeTarget::Url(url) => self.scripts.get(url),
        };
        ToolCommand {
            program: request.program.clone(),
            args: vec![script.unwrap_or(&self.fallback).clone().into_os_string()],
        }
    }
}

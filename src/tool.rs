//! Locating the gallery-dl executable

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

/// Name of the executable searched for on PATH
pub const TOOL_NAME: &str = "gallery-dl";

/// Upper bound for `pip show` and `--version` probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Install locations checked when neither PATH nor pip know the tool
const COMMON_PATHS: &[&str] = &[
    "/Library/Frameworks/Python.framework/Versions/3.14/bin/gallery-dl",
    "/Library/Frameworks/Python.framework/Versions/3.13/bin/gallery-dl",
    "/Library/Frameworks/Python.framework/Versions/3.12/bin/gallery-dl",
    "/Library/Frameworks/Python.framework/Versions/3.11/bin/gallery-dl",
    "/usr/local/bin/gallery-dl",
    "/usr/bin/gallery-dl",
    "C:\\Python314\\Scripts\\gallery-dl.exe",
    "C:\\Python313\\Scripts\\gallery-dl.exe",
    "C:\\Python312\\Scripts\\gallery-dl.exe",
    "C:\\Python311\\Scripts\\gallery-dl.exe",
];

/// Find gallery-dl on this machine
///
/// Tries PATH first, then the location reported by `pip3 show` / `pip show`,
/// then a list of well-known install paths.
pub async fn detect_gallery_dl() -> Option<PathBuf> {
    if let Ok(path) = which::which(TOOL_NAME) {
        tracing::debug!(path = %path.display(), "gallery-dl found on PATH");
        return Some(path);
    }

    for pip in ["pip3", "pip"] {
        if let Some(path) = from_pip(pip).await {
            tracing::debug!(path = %path.display(), pip, "gallery-dl found via pip");
            return Some(path);
        }
    }

    let found = COMMON_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.is_file());
    if found.is_none() {
        tracing::debug!("gallery-dl not found");
    }
    found
}

/// Report `gallery-dl --version`, or `None` if it cannot be run
pub async fn tool_version(path: &Path) -> Option<String> {
    let output = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new(path).arg("--version").kill_on_drop(true).output(),
    )
    .await
    .ok()?
    .ok()?;

    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}

async fn from_pip(pip: &str) -> Option<PathBuf> {
    let output = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new(pip)
            .args(["show", TOOL_NAME])
            .kill_on_drop(true)
            .output(),
    )
    .await
    .ok()?
    .ok()?;

    if !output.status.success() {
        return None;
    }
    let candidate = pip_bin_candidate(&String::from_utf8_lossy(&output.stdout))?;
    candidate.is_file().then_some(candidate)
}

/// Derive the script path from `pip show` output
///
/// `Location:` names the site-packages directory; the console script lives in
/// the `bin` directory of the same prefix.
fn pip_bin_candidate(pip_output: &str) -> Option<PathBuf> {
    static SITE_PACKAGES: OnceLock<Option<Regex>> = OnceLock::new();

    let location = pip_output
        .lines()
        .find_map(|line| line.strip_prefix("Location:"))?
        .trim();
    if location.is_empty() {
        return None;
    }

    let site_packages = SITE_PACKAGES
        .get_or_init(|| Regex::new(r"/lib/python[\d.]+/site-packages").ok())
        .as_ref()?;
    let bin_dir = site_packages.replace(location, "/bin");
    Some(Path::new(bin_dir.as_ref()).join(TOOL_NAME))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pip_location_maps_to_bin_dir() {
        let output = "Name: gallery-dl\nVersion: 1.27.0\nLocation: /usr/local/lib/python3.12/site-packages\nRequires: requests\n";
        assert_eq!(
            pip_bin_candidate(output),
            Some(PathBuf::from("/usr/local/bin/gallery-dl"))
        );
    }

    #[test]
    fn pip_output_without_location_yields_nothing() {
        assert!(pip_bin_candidate("WARNING: Package(s) not found: gallery-dl").is_none());
        assert!(pip_bin_candidate("Location:   ").is_none());
    }

    #[tokio::test]
    async fn version_of_missing_binary_is_none() {
        let version = tool_version(Path::new("/nonexistent/gallery-dl-xyz")).await;
        assert!(version.is_none());
    }

    #[tokio::test]
    async fn version_of_directory_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(tool_version(dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn detection_agrees_with_path_lookup() {
        // Whatever the machine has installed, a PATH hit must win
        if let Ok(on_path) = which::which(TOOL_NAME) {
            assert_eq!(detect_gallery_dl().await, Some(on_path));
        }
    }
}

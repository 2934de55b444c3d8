//! Per-platform cookie slots
//!
//! Each platform has one Netscape-format cookie file, `<data_dir>/cookies/<platform>.txt`.
//! The contents are passed to gallery-dl verbatim and never parsed here.

use std::path::{Path, PathBuf};

use crate::types::{CookieStatus, Platform};
use crate::{Error, Result};

/// File-backed cookie slots, one per platform
#[derive(Clone, Debug)]
pub struct CookieStore {
    dir: PathBuf,
}

impl CookieStore {
    /// Create a store rooted at `dir` (created lazily on first save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the cookie files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a platform's cookie file, whether or not it exists
    pub fn path_for(&self, platform: Platform) -> PathBuf {
        self.dir.join(format!("{}.txt", platform.as_str()))
    }

    /// Whether a cookie file is stored for `platform`
    pub async fn exists(&self, platform: Platform) -> bool {
        tokio::fs::try_exists(self.path_for(platform))
            .await
            .unwrap_or(false)
    }

    /// Store cookie file contents, replacing any previous file
    pub async fn save(&self, platform: Platform, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::Validation("Cookie content is required".to_string()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(platform);
        tokio::fs::write(&path, content).await?;
        tracing::info!(platform = %platform, path = %path.display(), "cookie file saved");
        Ok(())
    }

    /// Delete a platform's cookie file
    pub async fn delete(&self, platform: Platform) -> Result<()> {
        let path = self.path_for(platform);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(platform = %platform, "cookie file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound("No cookie file found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Which slots are filled
    pub async fn status(&self) -> CookieStatus {
        CookieStatus {
            instagram: self.exists(Platform::Instagram).await,
            twitter: self.exists(Platform::Twitter).await,
        }
    }
}

//! Persisted settings, cookie slots and gallery-dl discovery.

use std::path::PathBuf;

use crate::config::{Config, Settings, SettingsUpdate};
use crate::error::Result;
use crate::tool;
use crate::types::{CookieStatus, Platform, SystemStatus, ToolStatus};

use super::BatchDownloader;

/// Read the settings file, creating it from the configured defaults if missing
pub(crate) async fn load_settings(config: &Config) -> Result<Settings> {
    let path = config.persistence.settings_file();
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let settings: Settings = serde_json::from_slice(&bytes)?;
            tracing::debug!(path = %path.display(), "settings loaded");
            Ok(settings)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let settings = config.settings.clone();
            write_settings(&path, &settings).await?;
            tracing::info!(path = %path.display(), "settings file created with defaults");
            Ok(settings)
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_settings(path: &std::path::Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(settings)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

impl BatchDownloader {
    /// Current settings
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Merge a partial update into the settings and persist them
    ///
    /// Sessions already running keep the values they started with.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let mut settings = self.settings.write().await;
        let mut next = settings.clone();
        next.apply(update);
        write_settings(&self.config.persistence.settings_file(), &next).await?;
        *settings = next.clone();

        tracing::info!(
            batch_size = next.batch_size,
            max_already_exists = next.max_already_exists,
            batch_delay_ms = next.batch_delay.as_millis() as u64,
            "settings updated"
        );
        Ok(next)
    }

    /// Resolve the gallery-dl executable
    ///
    /// An explicit override wins, then the persisted setting, then the static
    /// configuration, then detection (if enabled).
    pub async fn resolve_tool(&self, override_path: Option<PathBuf>) -> Option<PathBuf> {
        if let Some(path) = override_path {
            return Some(path);
        }
        if let Some(path) = self.settings.read().await.gallery_dl_path.clone() {
            return Some(path);
        }
        if let Some(path) = self.config.tools.gallery_dl_path.clone() {
            return Some(path);
        }
        if self.config.tools.search_path {
            return tool::detect_gallery_dl().await;
        }
        None
    }

    /// gallery-dl installation state
    pub async fn tool_status(&self) -> ToolStatus {
        let path = self.resolve_tool(None).await;
        let version = match &path {
            Some(path) => tool::tool_version(path).await,
            None => None,
        };
        ToolStatus {
            installed: path.is_some(),
            path,
            version,
        }
    }

    /// Tool state, settings and cookie presence in one snapshot
    pub async fn system_status(&self) -> SystemStatus {
        let tool = self.tool_status().await;
        SystemStatus {
            gallery_dl_installed: tool.installed,
            gallery_dl_path: tool.path,
            gallery_dl_version: tool.version,
            settings: self.settings().await,
            cookies: self.cookies.status().await,
        }
    }

    /// Store a platform's cookie file
    pub async fn save_cookies(&self, platform: Platform, content: &str) -> Result<()> {
        self.cookies.save(platform, content).await
    }

    /// Delete a platform's cookie file
    pub async fn delete_cookies(&self, platform: Platform) -> Result<()> {
        self.cookies.delete(platform).await
    }

    /// Which cookie slots are filled
    pub async fn cookie_status(&self) -> CookieStatus {
        self.cookies.status().await
    }
}

//! Configuration types for batch-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// External tool configuration (gallery-dl binary)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to the gallery-dl executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub gallery_dl_path: Option<PathBuf>,

    /// Whether to search PATH and common install locations when no path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gallery_dl_path: None,
            search_path: true,
        }
    }
}

/// User-tunable session settings
///
/// These are the values the browser settings panel edits. They are persisted as
/// JSON in the data directory and can be overridden per session request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    /// Explicit gallery-dl path chosen by the user (overrides detection)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub gallery_dl_path: Option<PathBuf>,

    /// Number of accounts downloaded concurrently per batch (default: 5)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Consecutive already-downloaded files before an account is considered up to date (default: 10)
    #[serde(default = "default_max_already_exists")]
    pub max_already_exists: u32,

    /// Cooldown between batches in milliseconds (default: 3000)
    #[serde(default = "default_batch_delay", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub batch_delay: Duration,

    /// gallery-dl `sleep-request` range in seconds, e.g. "2-4"
    #[serde(default = "default_sleep_request")]
    pub sleep_request: String,

    /// gallery-dl downloader retries (default: 3)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// gallery-dl downloader timeout in seconds (default: 45)
    #[serde(default = "default_timeout")]
    pub timeout: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gallery_dl_path: None,
            batch_size: default_batch_size(),
            max_already_exists: default_max_already_exists(),
            batch_delay: default_batch_delay(),
            sleep_request: default_sleep_request(),
            retries: default_retries(),
            timeout: default_timeout(),
        }
    }
}

impl Settings {
    /// Apply a partial update, leaving absent fields untouched
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(path) = update.gallery_dl_path {
            self.gallery_dl_path = path;
        }
        if let Some(size) = update.batch_size {
            self.batch_size = size.max(1);
        }
        if let Some(max) = update.max_already_exists {
            self.max_already_exists = max.max(1);
        }
        if let Some(ms) = update.batch_delay_ms {
            self.batch_delay = Duration::from_millis(ms);
        }
        if let Some(sleep) = update.sleep_request {
            self.sleep_request = sleep;
        }
        if let Some(retries) = update.retries {
            self.retries = retries;
        }
        if let Some(timeout) = update.timeout {
            self.timeout = timeout;
        }
    }
}

/// Partial settings update (PATCH /settings)
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SettingsUpdate {
    /// New gallery-dl path; `null` clears an explicit path
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub gallery_dl_path: Option<Option<PathBuf>>,
    /// Accounts per batch
    pub batch_size: Option<usize>,
    /// Duplicate streak threshold
    pub max_already_exists: Option<u32>,
    /// Cooldown between batches in milliseconds
    pub batch_delay_ms: Option<u64>,
    /// gallery-dl sleep-request range
    pub sleep_request: Option<String>,
    /// gallery-dl retries
    pub retries: Option<u32>,
    /// gallery-dl timeout in seconds
    pub timeout: Option<u32>,
}

/// Rules for reading gallery-dl output
///
/// gallery-dl prints one path per downloaded file and prefixes files it skipped
/// because they already exist with `#`. Neither format is a documented contract,
/// so the marker and path fragments are configurable.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OutputConfig {
    /// Prefix gallery-dl puts in front of already-downloaded files (default: '#')
    #[serde(default = "default_exists_marker")]
    #[schema(value_type = String)]
    pub exists_marker: char,

    /// Path fragments identifying the download or cache directory
    ///
    /// A fragment matches at the start of a line or directly after a `/`.
    #[serde(default = "default_path_fragments")]
    pub path_fragments: Vec<String>,

    /// Benign stderr substrings that are dropped silently
    #[serde(default = "default_noise_patterns")]
    pub noise_patterns: Vec<String>,

    /// Case-insensitive stderr substrings signalling expired or invalid cookies
    #[serde(default = "default_auth_failure_patterns")]
    pub auth_failure_patterns: Vec<String>,

    /// How long a terminated process may take to exit before it is killed (default: 5s)
    #[serde(default = "default_kill_grace", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub kill_grace: Duration,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            exists_marker: default_exists_marker(),
            path_fragments: default_path_fragments(),
            noise_patterns: default_noise_patterns(),
            auth_failure_patterns: default_auth_failure_patterns(),
            kill_grace: default_kill_grace(),
        }
    }
}

/// Data storage locations
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Directory holding settings, cookies and the archive database (default: "./data")
    #[serde(default = "default_data_dir")]
    #[schema(value_type = String)]
    pub data_dir: PathBuf,

    /// Archive database path (default: "./data/archive.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,

    /// Directory gallery-dl writes into (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: default_database_path(),
            download_dir: default_download_dir(),
        }
    }
}

impl PersistenceConfig {
    /// Settings file inside the data directory
    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Cookie slot directory inside the data directory
    pub fn cookies_dir(&self) -> PathBuf {
        self.data_dir.join("cookies")
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:3000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for BatchDownloader
///
/// - [`tools`](ToolsConfig) - gallery-dl binary location
/// - [`settings`](Settings) - initial session settings, used until a settings file exists
/// - [`output`](OutputConfig) - how tool output is interpreted
/// - [`persistence`](PersistenceConfig) - data and download directories
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// External tool settings
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Initial session settings
    #[serde(default)]
    pub settings: Settings,

    /// Output interpretation rules
    #[serde(default)]
    pub output: OutputConfig,

    /// Data storage locations
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Directory gallery-dl downloads into
    pub fn download_dir(&self) -> &PathBuf {
        &self.persistence.download_dir
    }
}

fn default_batch_size() -> usize {
    5
}

fn default_max_already_exists() -> u32 {
    10
}

fn default_batch_delay() -> Duration {
    Duration::from_millis(3000)
}

fn default_sleep_request() -> String {
    "2-4".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_timeout() -> u32 {
    45
}

fn default_true() -> bool {
    true
}

fn default_exists_marker() -> char {
    '#'
}

fn default_path_fragments() -> Vec<String> {
    vec!["downloads/".to_string(), "gallery-dl/".to_string()]
}

fn default_noise_patterns() -> Vec<String> {
    vec![
        "youtube_dl".to_string(),
        "Trying fallback URL".to_string(),
        "[download][info]".to_string(),
        "Initializing client transaction".to_string(),
    ]
}

fn default_auth_failure_patterns() -> Vec<String> {
    vec![
        "unauthorized".to_string(),
        "401".to_string(),
        "login_required".to_string(),
        "loginrequired".to_string(),
        "checkpoint_required".to_string(),
        "please wait a few minutes".to_string(),
    ]
}

fn default_kill_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/archive.db")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, matches the settings panel)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Distinguishes "field absent" from "field explicitly null"
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults_match_settings_panel() {
        let settings = Settings::default();
        assert_eq!(settings.batch_size, 5);
        assert_eq!(settings.max_already_exists, 10);
        assert_eq!(settings.batch_delay, Duration::from_millis(3000));
        assert_eq!(settings.sleep_request, "2-4");
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.timeout, 45);
        assert!(settings.gallery_dl_path.is_none());
    }

    #[test]
    fn settings_deserialize_from_empty_object_uses_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn batch_delay_serializes_as_milliseconds() {
        let settings = Settings {
            batch_delay: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["batch_delay"], 1500);

        let restored: Settings = serde_json::from_value(json).unwrap();
        assert_eq!(restored.batch_delay, Duration::from_millis(1500));
    }

    #[test]
    fn apply_update_changes_only_present_fields() {
        let mut settings = Settings::default();
        settings.apply(SettingsUpdate {
            batch_size: Some(8),
            sleep_request: Some("1-3".to_string()),
            ..Default::default()
        });

        assert_eq!(settings.batch_size, 8);
        assert_eq!(settings.sleep_request, "1-3");
        assert_eq!(settings.max_already_exists, 10);
        assert_eq!(settings.retries, 3);
    }

    #[test]
    fn apply_update_clamps_zero_batch_size_and_threshold() {
        let mut settings = Settings::default();
        settings.apply(SettingsUpdate {
            batch_size: Some(0),
            max_already_exists: Some(0),
            ..Default::default()
        });

        assert_eq!(settings.batch_size, 1);
        assert_eq!(settings.max_already_exists, 1);
    }

    #[test]
    fn explicit_null_clears_gallery_dl_path() {
        let mut settings = Settings {
            gallery_dl_path: Some(PathBuf::from("/opt/gallery-dl")),
            ..Default::default()
        };

        let absent: SettingsUpdate = serde_json::from_str(r#"{"retries": 5}"#).unwrap();
        settings.apply(absent);
        assert_eq!(
            settings.gallery_dl_path,
            Some(PathBuf::from("/opt/gallery-dl")),
            "absent field must leave the path alone"
        );

        let cleared: SettingsUpdate =
            serde_json::from_str(r#"{"gallery_dl_path": null}"#).unwrap();
        settings.apply(cleared);
        assert!(settings.gallery_dl_path.is_none());
    }

    #[test]
    fn output_defaults_cover_known_gallery_dl_markers() {
        let output = OutputConfig::default();
        assert_eq!(output.exists_marker, '#');
        assert!(output.path_fragments.contains(&"downloads/".to_string()));
        assert!(output.noise_patterns.iter().any(|p| p == "Trying fallback URL"));
        assert!(output.auth_failure_patterns.iter().any(|p| p == "401"));
    }

    #[test]
    fn persistence_paths_live_under_data_dir() {
        let persistence = PersistenceConfig {
            data_dir: PathBuf::from("/srv/batch"),
            ..Default::default()
        };
        assert_eq!(
            persistence.settings_file(),
            PathBuf::from("/srv/batch/config.json")
        );
        assert_eq!(persistence.cookies_dir(), PathBuf::from("/srv/batch/cookies"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let original = Config::default();
        let json = serde_json::to_string(&original).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.settings, original.settings);
        assert_eq!(
            restored.server.api.bind_address,
            original.server.api.bind_address
        );
        assert_eq!(
            restored.output.kill_grace, original.output.kill_grace,
            "kill_grace must survive round-trip"
        );
    }
}

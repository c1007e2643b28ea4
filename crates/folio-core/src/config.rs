//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/folio/config.toml)
//! 3. Environment variables (FOLIO_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ids::DEFAULT_ID_LENGTH;

/// Environment variable prefix
const ENV_PREFIX: &str = "FOLIO";

/// Which backend receives commit requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Apply commits directly to `content_root` (development relay)
    #[default]
    Local,
    /// Forward commits to a remote relay over WebSocket
    Relay,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "relay" => Ok(BackendKind::Relay),
            other => bail!("Unknown backend '{}', expected 'local' or 'relay'", other),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Relay => write!(f, "relay"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (drafts)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Root of the site repository holding `public/rebuild`
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,

    /// Active commit backend
    #[serde(default)]
    pub backend: BackendKind,

    /// Relay URL, required when `backend = "relay"`
    #[serde(default)]
    pub relay_url: Option<String>,

    /// Delay before reloading content after a successful commit
    #[serde(default = "default_reload_delay_ms")]
    pub reload_delay_ms: u64,

    /// Digits in freshly allocated item IDs
    #[serde(default = "default_id_length")]
    pub id_length: usize,

    /// Upper bound on waiting for a commit reply (no bound when unset)
    #[serde(default)]
    pub commit_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            content_root: default_content_root(),
            backend: BackendKind::default(),
            relay_url: None,
            reload_delay_ms: default_reload_delay_ms(),
            id_length: default_id_length(),
            commit_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FOLIO_DATA_DIR, FOLIO_CONTENT_ROOT, FOLIO_BACKEND, FOLIO_RELAY_URL)
    /// 2. Config file (~/.config/folio/config.toml or FOLIO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_CONTENT_ROOT", ENV_PREFIX)) {
            self.content_root = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_BACKEND", ENV_PREFIX)) {
            self.backend = val
                .parse()
                .with_context(|| format!("Invalid {}_BACKEND", ENV_PREFIX))?;
        }

        // Empty string clears it
        if let Ok(val) = std::env::var(format!("{}_RELAY_URL", ENV_PREFIX)) {
            self.relay_url = if val.is_empty() { None } else { Some(val) };
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Set a single value by key, as typed on the command line
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "content_root" => self.content_root = PathBuf::from(value),
            "backend" => self.backend = value.parse()?,
            "relay_url" => {
                self.relay_url = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "reload_delay_ms" => {
                self.reload_delay_ms = value
                    .parse()
                    .with_context(|| format!("Invalid reload_delay_ms: {}", value))?
            }
            "id_length" => {
                self.id_length = value
                    .parse()
                    .with_context(|| format!("Invalid id_length: {}", value))?
            }
            "commit_timeout_secs" => {
                self.commit_timeout_secs = if value.is_empty() {
                    None
                } else {
                    Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid commit_timeout_secs: {}", value))?,
                    )
                }
            }
            other => bail!("Unknown configuration key: {}", other),
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FOLIO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("config.toml")
    }

    /// Get the path to the drafts file
    pub fn drafts_path(&self) -> PathBuf {
        self.data_dir.join("drafts.json")
    }

    /// Delay before the post-commit reload
    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    /// Upper bound on a commit round-trip, if configured
    pub fn commit_timeout(&self) -> Option<Duration> {
        self.commit_timeout_secs.map(Duration::from_secs)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio")
}

fn default_content_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_reload_delay_ms() -> u64 {
    1000
}

fn default_id_length() -> usize {
    DEFAULT_ID_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "FOLIO_DATA_DIR",
        "FOLIO_CONTENT_ROOT",
        "FOLIO_BACKEND",
        "FOLIO_RELAY_URL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Local);
        assert!(config.relay_url.is_none());
        assert_eq!(config.reload_delay(), Duration::from_secs(1));
        assert_eq!(config.id_length, 4);
        assert!(config.commit_timeout().is_none());
        assert!(config.data_dir.ends_with("folio"));
    }

    #[test]
    fn test_drafts_path() {
        let config = Config::default();
        assert!(config.drafts_path().ends_with("drafts.json"));
    }

    #[test]
    fn test_env_override_paths() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("FOLIO_DATA_DIR", "/tmp/folio-test");
        env::set_var("FOLIO_CONTENT_ROOT", "/srv/blog");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/folio-test"));
        assert_eq!(config.content_root, PathBuf::from("/srv/blog"));
    }

    #[test]
    fn test_env_override_backend() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("FOLIO_BACKEND", "RELAY");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.backend, BackendKind::Relay);

        env::set_var("FOLIO_BACKEND", "github");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_env_override_relay_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("FOLIO_RELAY_URL", "ws://localhost:3000/rebuild");
        config.apply_env_overrides().unwrap();
        assert_eq!(
            config.relay_url,
            Some("ws://localhost:3000/rebuild".to_string())
        );

        // Empty string clears it
        env::set_var("FOLIO_RELAY_URL", "");
        config.apply_env_overrides().unwrap();
        assert!(config.relay_url.is_none());
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("backend", "relay").unwrap();
        config.set_value("reload_delay_ms", "250").unwrap();
        config.set_value("commit_timeout_secs", "30").unwrap();

        assert_eq!(config.backend, BackendKind::Relay);
        assert_eq!(config.reload_delay(), Duration::from_millis(250));
        assert_eq!(config.commit_timeout(), Some(Duration::from_secs(30)));

        config.set_value("commit_timeout_secs", "").unwrap();
        assert!(config.commit_timeout().is_none());

        assert!(config.set_value("id_length", "four").is_err());
        assert!(config.set_value("theme", "dark").is_err());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/folio"),
            content_root: PathBuf::from("/srv/blog"),
            backend: BackendKind::Relay,
            relay_url: Some("ws://relay.example.com".to_string()),
            reload_delay_ms: 500,
            id_length: 6,
            commit_timeout_secs: Some(20),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("backend = \"relay\""));
        assert!(toml_str.contains("relay_url"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.backend, config.backend);
        assert_eq!(parsed.relay_url, config.relay_url);
        assert_eq!(parsed.id_length, 6);
        assert_eq!(parsed.commit_timeout_secs, Some(20));
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            content_root = "/custom/site"
            backend = "relay"
            relay_url = "ws://example.com"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.content_root, PathBuf::from("/custom/site"));
        assert_eq!(config.backend, BackendKind::Relay);
        assert_eq!(config.relay_url, Some("ws://example.com".to_string()));
        // Unspecified fields fall back to defaults
        assert_eq!(config.reload_delay_ms, 1000);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("FOLIO_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
        assert!(config.data_dir.exists());
    }
}

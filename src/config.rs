//! Configuration: `~/.cadence/config.json`.
//!
//! Everything in here is optional except the sender name. A missing
//! `firestore` block means local-cache-only mode — degradation, not an
//! error. Collaborator credentials (Gmail access token, Gemini API key)
//! also live here; acquiring them is out of scope for this engine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Remote document store settings. Absent config degrades to local-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Signature substituted for the `[MyName]` template token.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default)]
    pub firestore: Option<FirestoreConfig>,
    /// Bearer token for the Gmail reply-detection probe.
    #[serde(default)]
    pub google_access_token: Option<String>,
    /// API key for the message-drafting collaborator.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    /// Override for the local cache directory (default `~/.cadence/cache`).
    #[serde(default)]
    pub cache_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            firestore: None,
            google_access_token: None,
            gemini_api_key: None,
            cache_dir: None,
        }
    }
}

fn default_sender_name() -> String {
    "Your Name".to_string()
}

/// Get the canonical config file path (~/.cadence/config.json)
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    Ok(home.join(".cadence").join("config.json"))
}

/// Get the state directory (~/.cadence), creating it if needed.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    let dir = home.join(".cadence");
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Resolve the local cache directory from config.
pub fn cache_dir(config: &Config) -> Result<PathBuf, ConfigError> {
    match &config.cache_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(state_dir()?.join("cache")),
    }
}

/// Load configuration from the canonical path. A missing file yields
/// defaults so the engine can start first-run in local-only mode.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit path; missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Create or update the config file at `path`.
///
/// Clones the current config (or defaults on first run), applies the
/// mutator, ensures the parent directory exists, and writes the result
/// back.
pub fn create_or_update_config(
    path: &Path,
    current: &Config,
    mutator: impl FnOnce(&mut Config),
) -> Result<Config, ConfigError> {
    let mut config = current.clone();
    mutator(&mut config);

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(&config)?;
    fs::write(path, content)?;
    Ok(config)
}

//! Client config load/save for `~/.chatbocs/config.yaml`.

use std::path::{Path, PathBuf};

use crate::session::WELCOME_TEXT;

pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_HTTP_BASE: &str = "http://localhost:8000";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Backend endpoints (socket_url, http_base).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_base: Option<String>,
}

/// Chat section (welcome greeting).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ChatSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome: Option<String>,
}

/// Log section (level filter, JSON output).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LogSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

/// Full config file. Every key is optional.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub log: LogSection,
}

impl Config {
    pub fn socket_url(&self) -> &str {
        self.server.socket_url.as_deref().unwrap_or(DEFAULT_SOCKET_URL)
    }

    pub fn http_base(&self) -> &str {
        self.server.http_base.as_deref().unwrap_or(DEFAULT_HTTP_BASE)
    }

    pub fn welcome(&self) -> &str {
        self.chat.welcome.as_deref().unwrap_or(WELCOME_TEXT)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn json_logs(&self) -> bool {
        self.log.json.unwrap_or(false)
    }
}

/// Returns the default config file path: `~/.chatbocs/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".chatbocs").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Like [`load`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load(path)
    } else {
        Ok(Config::default())
    }
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Config load/save error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

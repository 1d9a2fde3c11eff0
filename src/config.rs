//! Configuration management module
//!
//! YAML settings for the page agent and the CLI. Every section has defaults,
//! so an empty file (or none at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::reacquire::{DEFAULT_INTERVAL, DEFAULT_MAX_RETRIES};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reacquire: ReacquireConfig,
    #[serde(default)]
    pub hotkey: HotkeyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// File backing the session slot; defaults under the local data dir.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_storage_path)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReacquireConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_interval", with = "duration_str")]
    pub interval: Duration,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HotkeyConfig {
    #[serde(default = "default_hotkey")]
    pub key: String,
    #[serde(default = "default_true")]
    pub ctrl: bool,
}

impl HotkeyConfig {
    pub fn matches(&self, key: &str, ctrl: bool) -> bool {
        ctrl == self.ctrl && key.eq_ignore_ascii_case(&self.key)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for ReacquireConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: default_hotkey(),
            ctrl: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Knobs the page agent needs at runtime.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub reacquire: ReacquireConfig,
    pub hotkey: HotkeyConfig,
}

impl From<&Config> for AgentConfig {
    fn from(config: &Config) -> Self {
        Self {
            reacquire: config.reacquire.clone(),
            hotkey: config.hotkey.clone(),
        }
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_hotkey() -> String {
    "F1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_storage_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    path.push("iframe-resizer");
    path.push("session.json");
    path
}

/// `Duration` as a humantime string such as `1s` or `250ms`.
pub mod duration_str {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }

    /// Optional field variant, for use with `deserialize_with` and `default`.
    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(de::Error::custom))
            .transpose()
    }
}

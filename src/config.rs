//! Persistence for user preferences (config).
//!
//! - **Config** (`config.json`): display timezone, history and socket
//!   locations, saved to the platform config directory.
//!
//! Missing fields fall back to defaults, and an unreadable file behaves like
//! an empty one.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::clock::DEFAULT_DISPLAY_TZ;
use crate::ipc;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Daemon preferences (persisted to config.json).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone summaries are displayed in, e.g. "Asia/Manila"
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,
    /// Where completed sessions are stored. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_dir: Option<PathBuf>,
    /// IPC socket. Defaults to `$XDG_RUNTIME_DIR/studybot.sock`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
}

fn default_display_timezone() -> String {
    DEFAULT_DISPLAY_TZ.name().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_timezone: default_display_timezone(),
            history_dir: None,
            socket_path: None,
        }
    }
}

impl Config {
    /// The configured display timezone, or Asia/Manila if it doesn't parse.
    pub fn display_tz(&self) -> Tz {
        self.display_timezone.parse().unwrap_or_else(|_| {
            warn!(
                "unknown timezone {:?}, using {}",
                self.display_timezone,
                DEFAULT_DISPLAY_TZ.name()
            );
            DEFAULT_DISPLAY_TZ
        })
    }

    pub fn history_dir(&self) -> PathBuf {
        self.history_dir
            .clone()
            .or_else(|| data_dir().map(|d| d.join("history")))
            .unwrap_or_else(|| std::env::temp_dir().join("studybot").join("history"))
    }

    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(ipc::socket_path)
    }
}

// ---------------------------------------------------------------------------
// Directory helpers
// ---------------------------------------------------------------------------

/// Studybot config directory (e.g. `~/.config/studybot/`).
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("studybot"))
}

/// Studybot data directory (e.g. `~/.local/share/studybot/`).
fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("studybot"))
}

/// Default location of config.json
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.json"))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load config from disk, returning defaults if the file is missing or invalid.
pub fn load_config() -> Config {
    let Some(path) = default_config_path() else {
        return Config::default();
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("ignoring invalid config {}: {}", path.display(), e);
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Write bytes to a file atomically: write to a temp file in the same
/// directory, then rename over the target. Prevents partial JSON on crash.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    use std::io::Write;

    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.display_timezone, "Asia/Manila");
        assert_eq!(config.display_tz(), chrono_tz::Asia::Manila);
        assert!(config.history_dir.is_none());
        assert!(config.socket_path.is_none());
        assert!(config.socket_path().ends_with(ipc::SOCKET_NAME));
    }

    #[test]
    fn config_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            display_timezone: "America/Los_Angeles".to_string(),
            history_dir: Some(dir.path().join("history")),
            socket_path: Some(dir.path().join("bot.sock")),
        };
        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.display_tz(), chrono_tz::America::Los_Angeles);
        assert_eq!(loaded.history_dir(), dir.path().join("history"));
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_invalid_json_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not valid json!!!").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }

    #[test]
    fn config_extra_fields_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"display_timezone":"UTC","unknown_field":42}"#).unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.display_timezone, "UTC");
        assert_eq!(config.display_tz(), chrono_tz::UTC);
    }

    #[test]
    fn unknown_timezone_falls_back() {
        let config = Config {
            display_timezone: "Mars/Olympus_Mons".to_string(),
            ..Config::default()
        };
        assert_eq!(config.display_tz(), chrono_tz::Asia::Manila);
    }
}

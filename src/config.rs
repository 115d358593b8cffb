//! Configuration management for nyaastream
//!
//! Handles config file loading and first-run bootstrap.
//! Config is stored at ~/.config/nyaastream/config.toml

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::stream::PlayerType;

/// Value of `history.location` that selects the computed default path
pub const DEFAULT_LOCATION: &str = "default";

/// Extensions treated as playable media when filtering file lists
const DEFAULT_FORMATS: &[&str] = &[
    ".mkv", ".mp4", ".avi", ".webm", ".m4v", ".mov", ".wmv", ".flv", ".ts", ".ogm", ".mp3",
    ".flac", ".m4a", ".ogg", ".opus", ".wav",
];

/// Errors from loading or writing the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub playback: PlaybackConfig,
    /// Upstream query filters. The first letter of each key is the
    /// parameter name nyaa.si expects (`category` -> `c`).
    pub nyaa: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Path of the history log, or `"default"`
    pub location: String,
    /// Whether watched selections are recorded at all
    pub record: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub player: PlayerType,
    /// Passed verbatim to the player through webtorrent
    pub player_args: String,
    /// Recognised media extensions
    pub formats: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut nyaa = BTreeMap::new();
        nyaa.insert("filter".to_string(), toml::Value::Integer(0));
        nyaa.insert("category".to_string(), toml::Value::String("1_2".into()));
        nyaa.insert("sort".to_string(), toml::Value::String("seeders".into()));
        nyaa.insert("order".to_string(), toml::Value::String("desc".into()));

        Self {
            history: HistoryConfig::default(),
            playback: PlaybackConfig::default(),
            nyaa,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            record: true,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            player: PlayerType::default(),
            player_args: String::new(),
            formats: DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl Config {
    /// Get config file path (~/.config/nyaastream/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nyaastream").join("config.toml"))
    }

    /// Load config from `path`, writing the defaults there first if the
    /// file doesn't exist yet
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Load config, asking the user to fix the file while it is invalid.
    ///
    /// Gives up with the last error when `input` reaches end of file.
    pub fn load_or_prompt(
        path: &Path,
        mut input: impl BufRead,
        mut out: impl Write,
    ) -> Result<Self, ConfigError> {
        loop {
            let err = match Self::load_from(path) {
                Ok(config) => return Ok(config),
                Err(err) => err,
            };

            tracing::warn!(path = %path.display(), error = %err, "invalid config file");
            let _ = writeln!(out, "Invalid config file {}: {}", path.display(), err);
            let _ = write!(out, "Fix it and press Enter to retry (Ctrl-D to quit): ");
            let _ = out.flush();

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) | Err(_) => return Err(err),
                Ok(_) => continue,
            }
        }
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml).map_err(write_err)
    }

    /// Resolved history log path
    pub fn history_path(&self) -> Option<PathBuf> {
        if self.history.location == DEFAULT_LOCATION {
            dirs::cache_dir().map(|p| p.join("nyaastream").join("history.txt"))
        } else {
            Some(PathBuf::from(&self.history.location))
        }
    }

    /// Upstream filter parameters; the query itself is added per search
    pub fn search_params(&self) -> Vec<(String, String)> {
        self
            .nyaa
            .iter()
            .filter_map(|(key, value)| {
                let short = key.chars().next()?.to_string();
                let value = match value {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((short, value))
            })
            .filter(|(key, _)| key != "q")
            .collect()
    }
}

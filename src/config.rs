//! Application configuration.
//!
//! The configuration is loaded from a JSON file, by default
//! `$XDG_CONFIG_HOME/sklt/config.json`.  Command-line options override
//! anything set here.
//!
//! # Example
//!
//! ```json
//! {
//!   "interval": "second",
//!   "format": "%a %d %b %H:%M:%S",
//!   "socket": "/run/user/1000/sway-ipc.sock",
//!   "layout_names": ["/home/me/.config/sklt/layouts.tsv"]
//! }
//! ```

use crate::interval::Interval;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// Every field is optional; a minimal `{}` file is valid and unknown keys
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time update interval.
    pub interval: Option<Interval>,
    /// strftime-style time format.  Defaults depend on the interval.
    pub format: Option<String>,
    /// Sway IPC socket.  Defaults to `$SWAYSOCK`.
    pub socket: Option<PathBuf>,
    /// Layout translation files, loaded in order.
    pub layout_names: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Layer `over` on top of `self`.
    ///
    /// Scalar settings from `over` win when set.  Layout name files are
    /// concatenated, `over`'s last, so its mappings take precedence.
    pub fn merge(self, over: Config) -> Config {
        let mut layout_names = self.layout_names;
        layout_names.extend(over.layout_names);
        Config {
            interval: over.interval.or(self.interval),
            format: over.format.or(self.format),
            socket: over.socket.or(self.socket),
            layout_names,
        }
    }
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/sklt`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("sklt")
}

/// Default location of the config file.
pub fn default_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

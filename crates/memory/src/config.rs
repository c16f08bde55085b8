//! Memory limits, read once at store construction.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Capacity and budget limits for conversation memory.
///
/// Changes to the file take effect on the next process start; there is no
/// live reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    /// Messages kept per scope before oldest-first eviction.
    pub max_messages_per_channel: usize,
    /// Default token budget for context selection.
    pub max_tokens_in_context: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages_per_channel: 100,
            max_tokens_in_context: 4000,
        }
    }
}

impl MemoryConfig {
    /// Reads the config file, creating it with defaults when missing.
    ///
    /// Invalid JSON is logged and the in-memory defaults are used for this
    /// process lifetime; the file on disk is left untouched. Fields absent
    /// from the file take their defaults, unknown fields are ignored.
    pub fn load_or_create(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "invalid memory config, using defaults"
                    );
                    Self::default()
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => {
                let config = Self::default();
                config.write_defaults(path);
                config
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "failed to read memory config, using defaults"
                );
                Self::default()
            }
        }
    }

    fn write_defaults(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %error, "failed to create config directory");
                return;
            }
        }
        let json = match serde_json::to_string_pretty(self) {
            Ok(json) => json,
            Err(error) => {
                warn!(error = %error, "failed to serialize default memory config");
                return;
            }
        };
        match std::fs::write(path, json) {
            Ok(()) => info!(path = %path.display(), "created default memory config"),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to write default memory config");
            }
        }
    }
}

//! Bot configuration: Discord connection, completion endpoint, file paths.
//! Loaded from env; the per-file AI settings are bootstrapped with defaults on
//! first run.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use llm_client::{FormattingConfig, GenerationConfig, SystemPromptConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

/// Process-level config from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// BOT_TOKEN
    pub bot_token: String,
    /// API_SERVER: base URL of the completion endpoint
    pub api_server: String,
    /// Log file path
    pub log_file: String,
    /// Root directory for per-scope memory files
    pub memory_dir: PathBuf,
    /// Directory holding the JSON config files
    pub config_dir: PathBuf,
}

impl BotConfig {
    /// Load from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        let api_server =
            env::var("API_SERVER").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/discord-bot.log".to_string());
        let memory_dir = env::var("MEMORY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/memory"));
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        Ok(Self {
            bot_token,
            api_server,
            log_file,
            memory_dir,
            config_dir,
        })
    }

    /// Validate config (API_SERVER must be a valid URL).
    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.api_server).is_err() {
            anyhow::bail!("API_SERVER is not a valid URL: {}", self.api_server);
        }
        Ok(())
    }

    pub fn memory_config_file(&self) -> PathBuf {
        self.config_dir.join("memory-config.json")
    }
}

/// The three endpoint-facing config files, loaded at startup.
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub generation: GenerationConfig,
    pub formatting: FormattingConfig,
    pub system_prompt: String,
}

impl AiSettings {
    /// Loads `ai-config.json`, `formatting.json` and `system-prompt.json`
    /// from `config_dir`, creating each with defaults when missing. Invalid
    /// files are logged and replaced by in-memory defaults for this process.
    pub fn load_or_create(config_dir: &Path) -> Self {
        let generation: GenerationConfig = load_or_create_json(&config_dir.join("ai-config.json"));
        let formatting: FormattingConfig = load_or_create_json(&config_dir.join("formatting.json"));
        let system_prompt: SystemPromptConfig =
            load_or_create_json(&config_dir.join("system-prompt.json"));
        Self {
            generation,
            formatting,
            system_prompt: system_prompt.prompt,
        }
    }
}

/// Reads `path` as JSON, writing the default value there when the file does
/// not exist. A file that fails to parse is logged and left untouched; the
/// default is used for this process lifetime.
fn load_or_create_json<T: Serialize + DeserializeOwned + Default>(path: &Path) -> T {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "invalid config file, using defaults");
                T::default()
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            let value = T::default();
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match serde_json::to_string_pretty(&value) {
                Ok(json) => match std::fs::write(path, json) {
                    Ok(()) => info!(path = %path.display(), "created default config file"),
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "failed to write default config file");
                    }
                },
                Err(error) => warn!(error = %error, "failed to serialize default config"),
            }
            value
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "failed to read config file, using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_files_are_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AiSettings::load_or_create(dir.path());

        assert!(dir.path().join("ai-config.json").exists());
        assert!(dir.path().join("formatting.json").exists());
        assert!(dir.path().join("system-prompt.json").exists());
        assert_eq!(settings.generation.max_new_tokens, 600);
        assert!(settings.system_prompt.contains("Discord"));
    }

    #[test]
    fn existing_settings_are_read_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("system-prompt.json"),
            r#"{"prompt": "You are a test fixture."}"#,
        )
        .unwrap();

        let settings = AiSettings::load_or_create(dir.path());
        assert_eq!(settings.system_prompt, "You are a test fixture.");
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults_without_repairing_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ai-config.json"), "][").unwrap();

        let settings = AiSettings::load_or_create(dir.path());
        assert_eq!(settings.generation.max_new_tokens, 600);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("ai-config.json")).unwrap(),
            "]["
        );
    }
}

//! Endpoint-facing configuration: sampling parameters, prompt delimiters,
//! and the system prompt. Each maps to one JSON file created with these
//! defaults when missing.

use serde::{Deserialize, Serialize};

/// Sampling and length parameters sent with every completion request.
///
/// The typed fields cover the parameters the bot is tuned with; anything else
/// found in the config file lands in `extra` and is forwarded to the endpoint
/// verbatim, so backend-specific samplers keep working without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub max_tokens: u32,
    pub truncation_length: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub min_p: f64,
    pub top_k: u32,
    pub repetition_penalty: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub stream: bool,
    pub stopping_strings: Vec<String>,
    pub stop: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let stop = vec![
            "\\nuser:".to_string(),
            "<|im_end|>".to_string(),
            "<|im_start|>user".to_string(),
            "<|im_start|>assistant".to_string(),
        ];
        Self {
            max_new_tokens: 600,
            max_tokens: 600,
            truncation_length: 32256,
            temperature: 1.15,
            top_p: 1.0,
            min_p: 0.055,
            top_k: 0,
            repetition_penalty: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: false,
            stopping_strings: stop.clone(),
            stop,
            extra: serde_json::Map::new(),
        }
    }
}

/// Prompt delimiters. Defaults are the ChatML tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingConfig {
    pub start_sequence: String,
    pub system_start: String,
    pub system_end: String,
    pub user_start: String,
    pub user_end: String,
    pub assistant_start: String,
    pub assistant_end: String,
    pub end_sequence: String,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            start_sequence: "<|im_start|>".to_string(),
            system_start: "system\n".to_string(),
            system_end: "<|im_end|>\n".to_string(),
            user_start: "<|im_start|>user\n".to_string(),
            user_end: "<|im_end|>\n".to_string(),
            assistant_start: "<|im_start|>assistant\n".to_string(),
            assistant_end: "<|im_end|>\n".to_string(),
            end_sequence: "<|im_end|>".to_string(),
        }
    }
}

/// The system prompt file: `{"prompt": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPromptConfig {
    pub prompt: String,
}

impl Default for SystemPromptConfig {
    fn default() -> Self {
        Self {
            prompt: "You are an enthusiastic AI user in a Discord chat. Respond naturally \
                     and conversationally to users' messages. Keep your responses concise \
                     but informative."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sampler_keys_survive_a_round_trip() {
        let json = r#"{"temperature": 0.7, "mirostat_tau": 5, "xtc_probability": 0.5}"#;
        let config: GenerationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.extra["mirostat_tau"], 5);

        let out: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(out["mirostat_tau"], 5);
        assert_eq!(out["xtc_probability"], 0.5);
    }

    #[test]
    fn defaults_include_the_chat_template_stops() {
        let config = GenerationConfig::default();
        assert!(config.stop.iter().any(|s| s == "<|im_end|>"));
        assert_eq!(config.stop, config.stopping_strings);
    }
}

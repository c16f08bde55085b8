//! # llm-client
//!
//! Minimal client for an OpenAI-compatible `/v1/completions` text endpoint:
//! build a prompt from conversation history, POST it with the configured
//! sampling parameters, read back the generated text. No tokenization and no
//! streaming; one request, one reply.

mod config;
mod prompt;

pub use config::{FormattingConfig, GenerationConfig, SystemPromptConfig};
pub use prompt::{build_prompt, clean_response, PromptMessage};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Endpoint {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    config: &'a GenerationConfig,
}

/// Response shapes differ between backends; the reply text is wherever the
/// first of `choices[0].text`, `text`, or `content` shows up.
#[derive(Debug, Default, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// Client for the text-generation endpoint. Cheap to clone; the underlying
/// HTTP client pools connections.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
}

impl CompletionClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5000`; the
    /// `/v1/completions` path is appended per request.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// POSTs the prompt with the full generation config and returns the raw
    /// generated text. Callers usually pass the result through
    /// [`clean_response`].
    #[instrument(skip(self, prompt, config), fields(prompt_len = prompt.len()))]
    pub async fn complete(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/v1/completions", self.base_url);
        debug!(url = %url, "sending completion request");

        let response = self
            .http
            .post(&url)
            .json(&CompletionRequest { prompt, config })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Endpoint { status, body });
        }

        let data: CompletionResponse = response.json().await?;
        if let Some(usage) = &data.usage {
            info!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "completion usage"
            );
        }

        let text = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.text)
            .or(data.text)
            .or(data.content)
            .unwrap_or_default();
        debug!(reply_len = text.len(), "completion received");
        Ok(text)
    }
}

//! Prompt assembly and reply cleanup for the completion endpoint.

use crate::config::FormattingConfig;

/// One history entry rendered into the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub author: String,
    pub content: String,
}

/// Renders the system block, one user block per history message
/// (`author: content`), then the assistant start token so the model continues
/// as the bot.
pub fn build_prompt(
    history: &[PromptMessage],
    system_prompt: &str,
    formatting: &FormattingConfig,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&formatting.start_sequence);
    prompt.push_str(&formatting.system_start);
    prompt.push_str(system_prompt);
    prompt.push_str(&formatting.system_end);

    for message in history {
        prompt.push_str(&formatting.user_start);
        prompt.push_str(&message.author);
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push_str(&formatting.user_end);
    }

    prompt.push_str(&formatting.assistant_start);
    prompt
}

/// Strips template and role tokens the model tends to echo back, collapses
/// runs of blank lines, and drops a leading `user:`/`assistant:` prefix.
pub fn clean_response(response: &str, formatting: &FormattingConfig) -> String {
    if response.is_empty() {
        return String::new();
    }

    let mut cleaned = response.to_string();
    let tokens = [
        formatting.start_sequence.as_str(),
        formatting.system_start.as_str(),
        formatting.system_end.as_str(),
        formatting.user_start.as_str(),
        formatting.user_end.as_str(),
        formatting.assistant_start.as_str(),
        formatting.assistant_end.as_str(),
        formatting.end_sequence.as_str(),
        "<|im_start|>",
        "<|im_end|>",
        "AI Assistant:",
        "user:",
        "system:",
        "assistant:",
    ];
    for token in tokens {
        if !token.is_empty() {
            cleaned = cleaned.replace(token, "");
        }
    }

    let mut cleaned = cleaned.trim().to_string();
    while cleaned.contains("\n\n\n") {
        cleaned = cleaned.replace("\n\n\n", "\n\n");
    }

    strip_role_prefix(&cleaned).trim_start().to_string()
}

/// Removes a case-insensitive `user:` or `assistant:` prefix left after token
/// stripping.
fn strip_role_prefix(text: &str) -> &str {
    let lower = text.to_lowercase();
    for prefix in ["user:", "assistant:"] {
        if lower.starts_with(prefix) {
            return &text[prefix.len()..];
        }
    }
    text
}

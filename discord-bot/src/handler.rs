//! Gateway event handler: records every channel message into conversation
//! memory and answers when the bot is mentioned.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use llm_client::{build_prompt, clean_response, CompletionClient, PromptMessage};
use memory::{MemoryMessage, MemoryStore};
use regex::Regex;
use serenity::all::{Context, EventHandler, Interaction, Message, Ready};
use serenity::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::commands;
use crate::config::AiSettings;

/// Discord rejects messages over 2000 characters; longer replies are split
/// and each chunk is sent and remembered separately.
const MAX_DISCORD_MESSAGE_LEN: usize = 2000;

/// User mention tags (`<@123>`, `<@!123>`) are noise in stored content and in
/// prompts.
static MENTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?\d+>").expect("mention pattern compiles"));

pub struct BotHandler {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) client: CompletionClient,
    pub(crate) settings: AiSettings,
}

impl BotHandler {
    pub fn new(store: Arc<MemoryStore>, client: CompletionClient, settings: AiSettings) -> Self {
        Self {
            store,
            client,
            settings,
        }
    }

    /// Generates and sends the reply for a message that mentioned the bot:
    /// select context, build the prompt, call the endpoint, then send the
    /// cleaned reply in chunks, remembering each sent chunk.
    #[instrument(skip(self, ctx, msg), fields(channel_id = %msg.channel_id))]
    async fn respond(&self, ctx: &Context, msg: &Message) -> anyhow::Result<()> {
        let _typing = msg.channel_id.start_typing(&ctx.http);

        let channel_id = msg.channel_id.to_string();
        let guild_id = msg.guild_id.map(|g| g.to_string());
        let window = self
            .store
            .select_context(&channel_id, guild_id.as_deref(), None)
            .await;
        info!(
            messages = window.messages.len(),
            estimated_tokens = window.estimated_tokens,
            "building prompt from context window"
        );

        let history: Vec<PromptMessage> = window
            .messages
            .iter()
            .map(|m| PromptMessage {
                author: m.author.clone(),
                content: m.content.clone(),
            })
            .collect();
        let prompt = build_prompt(&history, &self.settings.system_prompt, &self.settings.formatting);

        let raw = self.client.complete(&prompt, &self.settings.generation).await?;
        let reply = clean_response(&raw, &self.settings.formatting);
        if reply.is_empty() {
            warn!("endpoint returned an empty reply, nothing to send");
            return Ok(());
        }

        for chunk in split_chunks(&reply, MAX_DISCORD_MESSAGE_LEN) {
            let sent = msg.channel_id.say(&ctx.http, &chunk).await?;
            let record = MemoryMessage {
                id: sent.id.to_string(),
                channel_id: channel_id.clone(),
                guild_id: guild_id.clone(),
                author: sent.author.name.clone(),
                author_id: sent.author.id.to_string(),
                content: chunk,
                timestamp: message_timestamp(&sent),
                is_bot: true,
            };
            if let Err(error) = self.store.add_message(record).await {
                error!(error = %error, "failed to persist bot reply chunk");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for BotHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "bot connected");
        if let Err(error) = commands::register(&ctx).await {
            error!(error = %error, "failed to register slash commands");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let content = strip_mention_tags(&msg.content);
        if content.is_empty() {
            debug!(channel_id = %msg.channel_id, "ignoring message with no text content");
            return;
        }

        let stored = MemoryMessage {
            id: msg.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|g| g.to_string()),
            author: msg.author.name.clone(),
            author_id: msg.author.id.to_string(),
            content,
            timestamp: message_timestamp(&msg),
            is_bot: false,
        };
        if let Err(error) = self.store.add_message(stored).await {
            error!(
                error = %error,
                channel_id = %msg.channel_id,
                "failed to persist message to memory"
            );
        }

        let mentioned = match msg.mentions_me(&ctx).await {
            Ok(mentioned) => mentioned,
            Err(error) => {
                warn!(error = %error, "failed to resolve mention, skipping reply");
                false
            }
        };
        if !mentioned {
            return;
        }

        if let Err(error) = self.respond(&ctx, &msg).await {
            error!(error = %error, channel_id = %msg.channel_id, "failed to generate response");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(error) = commands::dispatch(self, &ctx, &command).await {
                error!(error = %error, command = %command.data.name, "slash command failed");
            }
        }
    }
}

/// Removes user mention tags and trims the remainder.
pub(crate) fn strip_mention_tags(content: &str) -> String {
    MENTION_TAG.replace_all(content, "").trim().to_string()
}

fn message_timestamp(msg: &Message) -> DateTime<Utc> {
    DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

/// Splits `text` into chunks of at most `limit` bytes on char boundaries,
/// preferring a newline or space break in the back half of each chunk.
pub(crate) fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if let Some(pos) = rest[..cut].rfind(['\n', ' ']) {
            if pos > limit / 2 {
                cut = pos;
            }
        }
        chunks.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

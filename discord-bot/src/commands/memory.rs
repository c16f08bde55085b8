//! `/memory` administrative command: stats, clear, info. Replies are
//! ephemeral and the command is gated on Manage Messages.

use memory::{ContextWindow, MemoryStats};
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage, Permissions,
};
use tracing::info;

use crate::handler::BotHandler;

const EMBED_COLOR: u32 = 0x3340d1;

pub fn build() -> CreateCommand {
    CreateCommand::new("memory")
        .description("manage bot memory")
        .default_member_permissions(Permissions::MANAGE_MESSAGES)
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "stats",
            "show memory stats",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "clear",
            "clear memory for this channel",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "info",
            "show memory info for this channel",
        ))
}

pub async fn run(
    handler: &BotHandler,
    ctx: &Context,
    command: &CommandInteraction,
) -> anyhow::Result<()> {
    let subcommand = command
        .data
        .options
        .first()
        .map(|option| option.name.as_str())
        .unwrap_or_default();
    let channel_id = command.channel_id.to_string();
    let guild_id = command.guild_id.map(|g| g.to_string());

    let message = match subcommand {
        "stats" => {
            let stats = handler.store.stats().await;
            CreateInteractionResponseMessage::new().embed(stats_embed(&stats))
        }
        "clear" => {
            handler.store.clear(&channel_id, guild_id.as_deref()).await?;
            info!(channel_id = %channel_id, "memory cleared via command");
            CreateInteractionResponseMessage::new()
                .content("memory has been cleared for this channel!")
        }
        "info" => {
            let window = handler
                .store
                .select_context(&channel_id, guild_id.as_deref(), None)
                .await;
            CreateInteractionResponseMessage::new().embed(info_embed(&window))
        }
        other => CreateInteractionResponseMessage::new()
            .content(format!("unknown memory subcommand: {other}")),
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(message.ephemeral(true)),
        )
        .await?;
    Ok(())
}

fn stats_embed(stats: &MemoryStats) -> CreateEmbed {
    let format_ts = |ts: Option<chrono::DateTime<chrono::Utc>>| {
        ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "none".to_string())
    };
    CreateEmbed::new()
        .title("memory stats")
        .colour(EMBED_COLOR)
        .field("total scopes", stats.scope_count.to_string(), true)
        .field("total messages", stats.total_messages.to_string(), true)
        .field("oldest message", format_ts(stats.oldest_timestamp), true)
        .field("newest message", format_ts(stats.newest_timestamp), true)
}

fn info_embed(window: &ContextWindow) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("channel memory info")
        .colour(EMBED_COLOR)
        .field(
            "messages in memory",
            window.messages.len().to_string(),
            true,
        )
        .field(
            "estimated tokens",
            window.estimated_tokens.to_string(),
            true,
        );

    if let Some(latest) = window.messages.last() {
        let author = if latest.is_bot {
            "Bot".to_string()
        } else {
            format!("{} <@{}>", latest.author, latest.author_id)
        };
        embed = embed.field(
            "most recent message",
            format!("**{}**: {}", author, preview(&latest.content, 200)),
            false,
        );
    }

    embed
}

/// First `limit` characters of `content`, with an ellipsis when truncated.
fn preview(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        content.to_string()
    } else {
        let head: String = content.chars().take(limit).collect();
        format!("{head}...")
    }
}

//! Slash command registration and dispatch.

pub mod memory;
pub mod ping;

use serenity::all::{Command, CommandInteraction, Context};
use tracing::{info, warn};

use crate::handler::BotHandler;

/// Registers the global slash commands once the gateway session is ready.
pub async fn register(ctx: &Context) -> serenity::Result<()> {
    Command::create_global_command(&ctx.http, ping::build()).await?;
    Command::create_global_command(&ctx.http, memory::build()).await?;
    info!("registered slash commands");
    Ok(())
}

pub async fn dispatch(
    handler: &BotHandler,
    ctx: &Context,
    command: &CommandInteraction,
) -> anyhow::Result<()> {
    match command.data.name.as_str() {
        "ping" => ping::run(ctx, command).await,
        "memory" => memory::run(handler, ctx, command).await,
        other => {
            warn!(command = other, "unknown slash command");
            Ok(())
        }
    }
}

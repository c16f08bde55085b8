//! Bot bootstrap: logging, config files, memory load, then the gateway
//! client. The memory store is fully loaded before the first event arrives.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use llm_client::CompletionClient;
use memory::{MemoryConfig, MemoryStore};
use serenity::all::GatewayIntents;
use tracing::info;

use crate::config::{AiSettings, BotConfig};
use crate::handler::BotHandler;
use crate::logger::init_tracing;

/// Main entry: validate config, init logging, load every conversation memory,
/// then connect to the gateway and run until shutdown.
pub async fn run_bot(config: BotConfig) -> Result<()> {
    config.validate()?;

    if let Some(parent) = Path::new(&config.log_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    init_tracing(&config.log_file)?;

    let memory_config = MemoryConfig::load_or_create(&config.memory_config_file());
    info!(
        max_messages = memory_config.max_messages_per_channel,
        max_tokens = memory_config.max_tokens_in_context,
        memory_dir = %config.memory_dir.display(),
        api_server = %config.api_server,
        "initializing bot"
    );

    // Blocking initialization barrier: no event is handled before the full
    // tree of conversation records is in memory.
    let store = Arc::new(MemoryStore::load(&config.memory_dir, memory_config).await?);
    let settings = AiSettings::load_or_create(&config.config_dir);
    let client = CompletionClient::new(&config.api_server);
    let handler = BotHandler::new(store, client, settings);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut discord = serenity::Client::builder(&config.bot_token, intents)
        .event_handler(handler)
        .await?;

    info!("bot started successfully");
    discord.start().await?;

    Ok(())
}

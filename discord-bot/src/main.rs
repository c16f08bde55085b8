//! Binary for the Discord chat bot (conversation memory + completion relay).

use anyhow::Result;
use clap::Parser;
use discord_bot::{run_bot, BotConfig, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = BotConfig::load(token)?;
            run_bot(config).await
        }
    }
}

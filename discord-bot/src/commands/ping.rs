//! `/ping` liveness check.

use serenity::all::{
    CommandInteraction, Context, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};

pub fn build() -> CreateCommand {
    CreateCommand::new("ping").description("check that the bot is alive")
}

pub async fn run(ctx: &Context, command: &CommandInteraction) -> anyhow::Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content("pong!"),
            ),
        )
        .await?;
    Ok(())
}

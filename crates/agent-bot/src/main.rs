//! PumpPie Telegram bot
//!
//! Long polling; every user gets a DCA agent on their first message.

use std::sync::Arc;

use agent_bot::bot::{self, commands::Command};
use agent_bot::{Settings, build, logging};
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use teloxide::utils::command::BotCommands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let _log_guard = logging::init(&settings)?;

    tracing::info!(
        env = %settings.env,
        llm = %settings.agent_llm,
        mcp_mode = %settings.agent_mcp_mode,
        "Starting {}",
        settings.app_name()
    );

    let (state, secrets) = build::build(settings).await?;
    let state = Arc::new(state);

    let bot = Bot::new(secrets.tg_bot_token);
    bot.set_my_commands(Command::bot_commands()).await?;
    bot.delete_webhook().drop_pending_updates(true).await?;

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    tracing::info!(
        "{}.{} started → {}",
        state.settings.app_title,
        state.settings.app_version,
        state.settings.app_url
    );

    Dispatcher::builder(bot, bot::handlers::schema())
        .dependencies(dptree::deps![Arc::clone(&state)])
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    state.shutdown().await;
    Ok(())
}

//! Slash commands

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::messages::{Language, Msg, get};
use super::{HandlerResult, language_of, tg_id};
use crate::state::AppState;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "PumpPie commands:")]
pub enum Command {
    #[command(description = "start working with the bot")]
    Start,
    #[command(description = "show available commands")]
    Help,
    #[command(description = "frequently asked questions")]
    Faq,
}

pub async fn handle(bot: Bot, msg: Message, cmd: Command, state: Arc<AppState>) -> HandlerResult {
    let lang = language_of(&msg);

    match cmd {
        Command::Start => start(&bot, &msg, &state, lang).await,
        Command::Help => {
            bot.send_message(msg.chat.id, get(Msg::CommandHelp, lang)).await?;
            Ok(())
        }
        Command::Faq => faq(&bot, &msg, &state, lang).await,
    }
}

/// Register the sender, then greet with the main keyboard
async fn start(bot: &Bot, msg: &Message, state: &AppState, lang: Language) -> HandlerResult {
    let Some((user, id)) = msg.from.as_ref().and_then(|u| Some((u, tg_id(u)?))) else {
        bot.send_message(msg.chat.id, get(Msg::ErrorNotUnderstood, lang)).await?;
        return Ok(());
    };

    tracing::debug!(tg_id = id, username = ?user.username, "User started the bot");

    if let Err(e) = state.db.users().upsert(id, user.username.as_deref()).await {
        tracing::error!(tg_id = id, error = %e, "Failed to register user");
        bot.send_message(msg.chat.id, get(Msg::ErrorGeneral, lang)).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, get(Msg::CommandStart, lang))
        .reply_markup(state.menu.keyboard(lang, false).await)
        .await?;
    Ok(())
}

/// Help text with the FAQ-only keyboard
pub async fn faq(bot: &Bot, msg: &Message, state: &AppState, lang: Language) -> HandlerResult {
    bot.send_message(msg.chat.id, get(Msg::CommandHelp, lang))
        .reply_markup(state.menu.keyboard(lang, true).await)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", "PumpPieBot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/help", "PumpPieBot").unwrap(), Command::Help);
        assert_eq!(Command::parse("/faq@PumpPieBot", "PumpPieBot").unwrap(), Command::Faq);
        assert!(Command::parse("/buy", "PumpPieBot").is_err());
    }

    #[test]
    fn test_command_list() {
        let names: Vec<_> = Command::bot_commands()
            .into_iter()
            .map(|c| c.command.trim_start_matches('/').to_string())
            .collect();
        assert_eq!(names, ["start", "help", "faq"]);
    }
}

//! Update routing
//!
//! ```text
//! message ─┬─ /command ──► commands::handle
//!          ├─ button   ──► canned reply
//!          ├─ text     ──► user's PumpPieAgent
//!          └─ other    ──► "not understood"
//! ```

use std::sync::Arc;

use teloxide::dispatching::DpHandlerDescription;
use teloxide::prelude::*;

use super::buttons::Button;
use super::commands::{self, Command};
use super::messages::{Language, Msg, get};
use super::{HandlerResult, language_of, tg_id};
use crate::error::BotError;
use crate::state::AppState;

pub fn schema() -> Handler<'static, DependencyMap, HandlerResult, DpHandlerDescription> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(commands::handle),
        )
        .branch(
            dptree::filter_map(|msg: Message| msg.text().and_then(Button::from_text))
                .endpoint(on_button),
        )
        .branch(
            dptree::filter_map(|msg: Message| msg.text().map(str::to_owned)).endpoint(on_text),
        )
        .branch(dptree::endpoint(on_unsupported))
}

async fn on_button(bot: Bot, msg: Message, button: Button, state: Arc<AppState>) -> HandlerResult {
    let lang = language_of(&msg);

    match button {
        Button::Faq => return commands::faq(&bot, &msg, &state, lang).await,
        Button::Confirm => {
            bot.send_message(msg.chat.id, get(Msg::RequestConfirmed, lang)).await?;
        }
        Button::Cancel => {
            bot.send_message(msg.chat.id, get(Msg::RequestCancelled, lang)).await?;
        }
        Button::Back => {
            bot.send_message(msg.chat.id, get(Msg::CommandStart, lang))
                .reply_markup(state.menu.keyboard(lang, false).await)
                .await?;
        }
    }
    Ok(())
}

/// Hand free text to the sender's agent
async fn on_text(bot: Bot, msg: Message, text: String, state: Arc<AppState>) -> HandlerResult {
    let lang = language_of(&msg);
    let Some(user_id) = msg.from.as_ref().and_then(tg_id) else {
        return reply(&bot, &msg, Msg::ErrorNotUnderstood, lang).await;
    };

    bot.send_message(msg.chat.id, get(Msg::ProcessingRequest, lang)).await?;

    let answer = match state.agents.get(user_id).await {
        Ok(agent) => agent.process_message(&text).await,
        Err(e) => {
            tracing::error!(user_id, error = %e, "Failed to create agent");
            e.user_message()
                .unwrap_or_else(|| get(Msg::ErrorGeneral, lang).to_string())
        }
    };

    bot.send_message(msg.chat.id, answer).await?;
    Ok(())
}

async fn on_unsupported(bot: Bot, msg: Message) -> HandlerResult {
    reply(&bot, &msg, Msg::ErrorNotUnderstood, language_of(&msg)).await
}

async fn reply(bot: &Bot, msg: &Message, key: Msg, lang: Language) -> Result<(), BotError> {
    bot.send_message(msg.chat.id, get(key, lang)).await?;
    Ok(())
}

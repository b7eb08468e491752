//! Telegram front end

pub mod buttons;
pub mod commands;
pub mod handlers;
pub mod menu;
pub mod messages;

use teloxide::types::{Message, User};

use crate::error::BotError;
use messages::Language;

pub type HandlerResult = Result<(), BotError>;

/// Reply language of the sender
pub fn language_of(msg: &Message) -> Language {
    Language::from_code(msg.from.as_ref().and_then(|u| u.language_code.as_deref()))
}

/// Telegram ids fit in 52 bits; this only fails on a malformed update
pub fn tg_id(user: &User) -> Option<i64> {
    i64::try_from(user.id.0).ok()
}

//! # agent-bot
//!
//! Telegram front end of PumpPie. Users are stored in Postgres; each one
//! talks to their own [`crypto_advisor::PumpPieAgent`].

pub mod agents;
pub mod bot;
pub mod build;
pub mod db;
pub mod error;
pub mod logging;
pub mod settings;
pub mod state;

pub use error::{BotError, Result};
pub use settings::Settings;
pub use state::AppState;

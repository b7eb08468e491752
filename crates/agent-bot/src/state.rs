//! Shared bot state

use crate::agents::AgentDirectory;
use crate::bot::menu::Menu;
use crate::db::Database;
use crate::settings::Settings;

pub struct AppState {
    pub settings: Settings,
    pub db: Database,
    pub menu: Menu,

    /// One agent per Telegram user, created on first message
    pub agents: AgentDirectory,
}

impl AppState {
    pub fn new(settings: Settings, db: Database) -> Self {
        let agents = AgentDirectory::new(
            settings.agent_llm,
            settings.agent_mcp_mode,
            settings.agent_cache_size,
        );
        Self {
            settings,
            db,
            menu: Menu::new(),
            agents,
        }
    }

    /// Close every agent and the pool
    pub async fn shutdown(&self) {
        let closed = self.agents.close_all().await;
        tracing::info!(agents = closed, "Agents closed");
        self.db.close().await;
        tracing::info!("Shutdown complete");
    }
}

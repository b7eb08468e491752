//! Startup sequence: logo, environment check, database, agent probe

use crypto_advisor::PumpPieAgent;

use crate::db::Database;
use crate::error::Result;
use crate::settings::{Secrets, Settings};
use crate::state::AppState;

const NBSP: &str = "\u{a0}";

pub fn logo() -> String {
    let pad = |n: usize| NBSP.repeat(n);
    let run = |c: &str, n: usize| c.repeat(n);

    [
        format!("\n{}{}>{}{}>", pad(8), run(":", 5), pad(1), run(":", 5)),
        format!("{}::{}:>{}::{}:>", pad(7), pad(2), pad(1), pad(2)),
        format!("{}{}>{}{}>", pad(6), run(":", 5), pad(1), run(":", 5)),
        format!("{}::{}::", pad(5), pad(5)),
        format!("{}:{}:\n", pad(4), pad(6)),
    ]
    .join("\n")
}

/// Prepare everything the dispatcher needs
pub async fn build(settings: Settings) -> Result<(AppState, Secrets)> {
    println!("{}", logo());
    tracing::info!("Building {} >>>", settings.app_name());

    let secrets = settings.secrets()?;
    let db = init_db(&secrets.db_url, &settings).await?;
    init_agent(&settings).await?;

    tracing::info!("Build completed!");
    Ok((AppState::new(settings, db), secrets))
}

async fn init_db(url: &str, settings: &Settings) -> Result<Database> {
    let db = Database::connect(url, &settings.database).await?;
    db.init_schema().await?;
    Ok(db)
}

/// Build a throwaway agent to catch model or server misconfiguration at startup
async fn init_agent(settings: &Settings) -> Result<()> {
    let probe = PumpPieAgent::new(0, settings.agent_llm, None, settings.agent_mcp_mode).await?;
    let health = probe.health_check();
    probe.close().await;

    tracing::info!(
        model = %health.model,
        mcp_mode = %health.mcp_mode,
        language = %settings.agent_lang,
        servers = health.mcp_servers.count,
        agents_ready = health.agents_initialized.all(),
        status = %health.status,
        "Agent initialized"
    );
    tracing::debug!(
        health = %serde_json::to_string(&health).unwrap_or_default(),
        "Agent health"
    );

    Ok(())
}

//! Settings
//!
//! Read from the process environment after loading `.env.{ENV}`. Parsing is
//! done through a lookup function so tests never touch the real environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crypto_advisor::{LlmModel, McpMode};

use crate::error::{BotError, Result};

pub const ENV_VAR_TG_BOT_TOKEN: &str = "ENV_VAR_TG_BOT_TOKEN";
pub const ENV_VAR_DB_URL: &str = "ENV_VAR_DB_URL";

const DEFAULT_AGENT_CACHE_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    Dev,
    #[default]
    Prod,
}

impl Environment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    pub const fn is_dev(self) -> bool {
        matches!(self, Self::Dev)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(invalid("ENV", other, "expected dev or prod")),
        }
    }
}

/// Postgres pool limits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub pool_size: u32,
    pub max_overflow: u32,
    pub pool_timeout: Duration,
    pub connect_timeout: Duration,

    /// Log every statement
    pub sql_echo: bool,
}

impl DatabaseSettings {
    fn for_env(env: Environment) -> Self {
        Self {
            pool_size: 40,
            max_overflow: 60,
            pool_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            sql_echo: env.is_dev(),
        }
    }

    pub const fn max_connections(&self) -> u32 {
        self.pool_size + self.max_overflow
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub env: Environment,

    pub app_title: String,
    pub app_version: String,
    pub app_url: String,

    /// Language the agents answer in
    pub agent_lang: String,
    pub agent_llm: LlmModel,
    pub agent_mcp_mode: McpMode,

    /// Most agents kept alive at once
    pub agent_cache_size: usize,

    pub logs_dir: PathBuf,

    /// Default filter when `RUST_LOG` is unset
    pub log_level: &'static str,

    pub database: DatabaseSettings,

    pub tg_bot_token: Option<String>,
    pub db_url: Option<String>,
}

/// Values the bot cannot start without
#[derive(Clone)]
pub struct Secrets {
    pub tg_bot_token: String,
    pub db_url: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

impl Settings {
    /// Load `.env.{ENV}` then read the process environment
    pub fn load() -> Result<Self> {
        let env = std::env::var("ENV").unwrap_or_else(|_| Environment::default().to_string());
        let file = format!(".env.{env}");
        if let Err(e) = dotenvy::from_filename(&file) {
            // Logging is not set up yet
            eprintln!("{file} not loaded: {e}");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let env: Environment = get("ENV").map_or(Ok(Environment::default()), |v| v.parse())?;

        let agent_llm = match get("AGENT_LLM") {
            Some(v) => v
                .parse::<LlmModel>()
                .map_err(|e| invalid("AGENT_LLM", &v, e))?,
            None => LlmModel::Test,
        };
        let agent_mcp_mode = match get("AGENT_MCP_MODE") {
            Some(v) => v
                .parse::<McpMode>()
                .map_err(|e| invalid("AGENT_MCP_MODE", &v, e))?,
            None => McpMode::Test,
        };
        let agent_cache_size = match get("AGENT_CACHE_SIZE") {
            Some(v) => match v.trim().parse::<usize>() {
                Ok(0) => return Err(invalid("AGENT_CACHE_SIZE", &v, "must be at least 1")),
                Ok(n) => n,
                Err(e) => return Err(invalid("AGENT_CACHE_SIZE", &v, e)),
            },
            None => DEFAULT_AGENT_CACHE_SIZE,
        };

        Ok(Self {
            env,
            app_title: "PumpPie".into(),
            app_version: "v1".into(),
            app_url: "https://t.me/PumpPieBot".into(),
            agent_lang: get("AGENT_LANG").unwrap_or_else(|| "en".into()),
            agent_llm,
            agent_mcp_mode,
            agent_cache_size,
            logs_dir: get("LOGS_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from),
            log_level: if env.is_dev() { "debug" } else { "info" },
            database: DatabaseSettings::for_env(env),
            tg_bot_token: get(ENV_VAR_TG_BOT_TOKEN),
            db_url: get(ENV_VAR_DB_URL),
        })
    }

    /// Fail naming the first missing required variable
    pub fn secrets(&self) -> Result<Secrets> {
        let tg_bot_token = self
            .tg_bot_token
            .clone()
            .ok_or(BotError::MissingEnv(ENV_VAR_TG_BOT_TOKEN))?;
        let db_url = self
            .db_url
            .clone()
            .ok_or(BotError::MissingEnv(ENV_VAR_DB_URL))?;

        Ok(Secrets {
            tg_bot_token,
            db_url,
        })
    }

    /// "PumpPie v1"
    pub fn app_name(&self) -> String {
        format!("{} {}", self.app_title, self.app_version)
    }
}

fn invalid(name: &'static str, value: &str, reason: impl fmt::Display) -> BotError {
    BotError::InvalidEnv {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.env, Environment::Prod);
        assert_eq!(s.app_name(), "PumpPie v1");
        assert_eq!(s.app_url, "https://t.me/PumpPieBot");
        assert_eq!(s.agent_lang, "en");
        assert_eq!(s.agent_llm, LlmModel::Test);
        assert_eq!(s.agent_mcp_mode, McpMode::Test);
        assert_eq!(s.agent_cache_size, 100);
        assert_eq!(s.logs_dir, PathBuf::from("logs"));
        assert_eq!(s.log_level, "info");
        assert!(!s.database.sql_echo);
        assert_eq!(s.database.max_connections(), 100);
        assert_eq!(s.database.pool_timeout, Duration::from_secs(30));
        assert_eq!(s.database.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_dev_environment() {
        let s = settings(&[("ENV", "dev"), ("AGENT_MCP_MODE", "python")]).unwrap();
        assert_eq!(s.log_level, "debug");
        assert!(s.database.sql_echo);
        assert_eq!(s.agent_mcp_mode, McpMode::Python);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            settings(&[("ENV", "staging")]),
            Err(BotError::InvalidEnv { name: "ENV", .. })
        ));
        assert!(matches!(
            settings(&[("AGENT_LLM", "gpt-2")]),
            Err(BotError::InvalidEnv { name: "AGENT_LLM", .. })
        ));
        for size in ["0", "-5", "many"] {
            assert!(matches!(
                settings(&[("AGENT_CACHE_SIZE", size)]),
                Err(BotError::InvalidEnv { name: "AGENT_CACHE_SIZE", .. })
            ));
        }
        assert_eq!(settings(&[("AGENT_CACHE_SIZE", "5")]).unwrap().agent_cache_size, 5);
    }

    #[test]
    fn test_secrets_name_missing_variable() {
        let none = settings(&[]).unwrap();
        let err = none.secrets().unwrap_err();
        assert_eq!(err.to_string(), "Environment variable ENV_VAR_TG_BOT_TOKEN is not set.");

        let token_only = settings(&[(ENV_VAR_TG_BOT_TOKEN, "123:abc")]).unwrap();
        assert!(matches!(
            token_only.secrets(),
            Err(BotError::MissingEnv(ENV_VAR_DB_URL))
        ));

        let both = settings(&[
            (ENV_VAR_TG_BOT_TOKEN, "123:abc"),
            (ENV_VAR_DB_URL, "postgres://localhost/pumppie"),
        ])
        .unwrap();
        assert_eq!(both.secrets().unwrap().db_url, "postgres://localhost/pumppie");
    }
}

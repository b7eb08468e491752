//! Per-user agent configuration
//!
//! Stored as a JSON object. Missing keys take their defaults, so partially
//! written configs from older versions still load.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};
use crate::outputs::DcaInterval;

/// A tool server the user has configured
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

/// DCA limits and smart-DCA parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcaConfig {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub supported_intervals: Vec<DcaInterval>,
    pub default_interval: DcaInterval,

    /// Daily volatility above which purchases are spread out (0.05 = 5%)
    pub volatility_threshold: f64,

    pub rsi_oversold: u8,
    pub rsi_overbought: u8,
}

impl Default for DcaConfig {
    fn default() -> Self {
        Self {
            min_amount: dec!(1.0),
            max_amount: dec!(10000.0),
            supported_intervals: DcaInterval::ALL.to_vec(),
            default_interval: DcaInterval::Weekly,
            volatility_threshold: 0.05,
            rsi_oversold: 30,
            rsi_overbought: 70,
        }
    }
}

impl DcaConfig {
    /// Reject amounts and intervals outside the configured limits
    pub fn check_request(&self, amount: Decimal, interval: DcaInterval) -> Result<()> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(AdvisorError::Validation(format!(
                "amount {amount} outside allowed range {} - {}",
                self.min_amount, self.max_amount
            )));
        }
        if !self.supported_intervals.contains(&interval) {
            return Err(AdvisorError::Validation(format!(
                "interval '{interval}' is not enabled"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskManagementConfig {
    /// Max share of the portfolio in crypto
    pub max_portfolio_allocation: f64,

    /// Max share in a single asset
    pub max_single_asset_allocation: f64,

    /// Stop when an asset drops this much (-0.2 = -20%)
    pub stop_loss_threshold: f64,

    /// Take profit at this gain (2.0 = +200%)
    pub take_profit_threshold: f64,
}

impl Default for RiskManagementConfig {
    fn default() -> Self {
        Self {
            max_portfolio_allocation: 0.8,
            max_single_asset_allocation: 0.3,
            stop_loss_threshold: -0.2,
            take_profit_threshold: 2.0,
        }
    }
}

/// Main agent configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Telegram user ID
    pub user_id: i64,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,

    #[serde(default)]
    pub dca_config: DcaConfig,

    #[serde(default)]
    pub risk_management: RiskManagementConfig,

    #[serde(default = "default_true")]
    pub auto_rebalance: bool,

    #[serde(default)]
    pub rebalance_frequency: DcaInterval,

    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    #[serde(default)]
    pub exchange: Option<String>,

    #[serde(default)]
    pub api_key_encrypted: Option<String>,
}

fn default_language() -> String {
    "en".into()
}

impl AgentConfig {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            language: default_language(),
            mcp_servers: Vec::new(),
            dca_config: DcaConfig::default(),
            risk_management: RiskManagementConfig::default(),
            auto_rebalance: true,
            rebalance_frequency: DcaInterval::Weekly,
            notifications_enabled: true,
            exchange: None,
            api_key_encrypted: None,
        }
    }

    /// Defaults with the planned (not yet enabled) bundled servers
    pub fn create_default(user_id: i64) -> Self {
        let planned = |name: &str| McpServerConfig {
            name: name.into(),
            command: format!("pumppie-{}", name.replace('_', "-")),
            args: Vec::new(),
            enabled: false,
        };

        Self {
            mcp_servers: vec![planned("market_data"), planned("portfolio")],
            ..Self::new(user_id)
        }
    }

    pub fn to_dict(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a stored config; only `user_id` is required
    pub fn from_dict(data: &serde_json::Value) -> Result<Self> {
        if data.get("user_id").is_none() {
            return Err(AdvisorError::Config("user_id is required".into()));
        }
        Ok(Self::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_servers_are_static_and_disabled() {
        let a = AgentConfig::create_default(1);
        let b = AgentConfig::create_default(999_999);

        assert_eq!(a.mcp_servers, b.mcp_servers);
        let names: Vec<_> = a.mcp_servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["market_data", "portfolio"]);
        assert!(a.mcp_servers.iter().all(|s| !s.enabled));
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::create_default(5);
        assert_eq!(config.language, "en");
        assert_eq!(config.dca_config.min_amount, dec!(1));
        assert_eq!(config.dca_config.max_amount, dec!(10000));
        assert_eq!(config.dca_config.default_interval, DcaInterval::Weekly);
        assert_eq!(config.dca_config.rsi_oversold, 30);
        assert_eq!(config.dca_config.rsi_overbought, 70);
        assert!((config.risk_management.stop_loss_threshold + 0.2).abs() < f64::EPSILON);
        assert!(config.auto_rebalance);
        assert!(config.notifications_enabled);
        assert!(config.exchange.is_none());
    }

    #[test]
    fn test_dict_roundtrip_across_fields() {
        let mut variants = vec![AgentConfig::new(1), AgentConfig::create_default(2)];

        let mut custom = AgentConfig::create_default(-42);
        custom.language = "ru".into();
        custom.mcp_servers.push(McpServerConfig {
            name: "fetch".into(),
            command: "npx".into(),
            args: vec!["-y".into(), "@modelcontextprotocol/server-fetch".into()],
            enabled: true,
        });
        custom.dca_config.min_amount = dec!(5.25);
        custom.dca_config.supported_intervals = vec![DcaInterval::Monthly];
        custom.dca_config.default_interval = DcaInterval::Monthly;
        custom.dca_config.volatility_threshold = 0.125;
        custom.risk_management.max_single_asset_allocation = 0.5;
        custom.auto_rebalance = false;
        custom.rebalance_frequency = DcaInterval::Daily;
        custom.notifications_enabled = false;
        custom.exchange = Some("binance".into());
        custom.api_key_encrypted = Some("gAAAA-encrypted".into());
        variants.push(custom);

        for config in variants {
            let dict = config.to_dict().unwrap();
            assert_eq!(AgentConfig::from_dict(&dict).unwrap(), config);
        }
    }

    #[test]
    fn test_from_dict_fills_defaults() {
        let config = AgentConfig::from_dict(&serde_json::json!({
            "user_id": 7,
            "dca_config": {"min_amount": 10}
        }))
        .unwrap();

        assert_eq!(config.dca_config.min_amount, dec!(10));
        assert_eq!(config.dca_config.max_amount, dec!(10000));
        assert_eq!(config.rebalance_frequency, DcaInterval::Weekly);
        assert!(config.mcp_servers.is_empty());
    }

    #[test]
    fn test_from_dict_requires_user_id() {
        assert!(matches!(
            AgentConfig::from_dict(&serde_json::json!({"language": "en"})),
            Err(AdvisorError::Config(_))
        ));
    }

    #[test]
    fn test_check_request() {
        let dca = DcaConfig::default();
        assert!(dca.check_request(dec!(100), DcaInterval::Weekly).is_ok());
        assert!(dca.check_request(dec!(0.5), DcaInterval::Weekly).is_err());
        assert!(dca.check_request(dec!(10001), DcaInterval::Daily).is_err());

        let monthly_only = DcaConfig {
            supported_intervals: vec![DcaInterval::Monthly],
            ..DcaConfig::default()
        };
        assert!(monthly_only.check_request(dec!(100), DcaInterval::Daily).is_err());
    }
}

//! Per-user data access for the agents
//!
//! Storage is not wired in yet; every lookup returns fixed placeholder data.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::outputs::RiskLevel;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub default_currency: String,
    pub preferred_assets: Vec<String>,
    pub notification_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentLimits {
    pub max_single_investment: Decimal,
    pub max_monthly_investment: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub preferences: UserPreferences,
    pub risk_tolerance: RiskLevel,
    pub experience_level: ExperienceLevel,
    pub investment_limits: InvestmentLimits,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioPerformance {
    pub total_return: Decimal,
    pub total_return_percentage: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value: Decimal,
    pub positions: Vec<serde_json::Value>,
    pub active_strategies: Vec<serde_json::Value>,
    pub performance: PortfolioPerformance,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: Decimal,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,

    /// Daily volatility (0.05 = 5%)
    pub volatility: f64,
}

/// Context handed to agents for one user
#[derive(Clone, Debug)]
pub struct AgentDependencies {
    pub user_id: i64,
}

impl AgentDependencies {
    pub const fn new(user_id: i64) -> Self {
        Self { user_id }
    }

    pub async fn get_user_config(&self) -> UserProfile {
        UserProfile {
            preferences: UserPreferences {
                default_currency: "USD".into(),
                preferred_assets: vec!["BTC".into(), "ETH".into()],
                notification_enabled: true,
            },
            risk_tolerance: RiskLevel::Moderate,
            experience_level: ExperienceLevel::Intermediate,
            investment_limits: InvestmentLimits {
                max_single_investment: dec!(1000.0),
                max_monthly_investment: dec!(5000.0),
            },
        }
    }

    pub async fn get_user_portfolio(&self) -> PortfolioSnapshot {
        PortfolioSnapshot::default()
    }

    /// Returns the strategy id; nothing is persisted yet
    pub async fn save_dca_strategy(&self, asset: &str) -> String {
        let strategy_id = strategy_id(self.user_id, asset);
        tracing::info!(user_id = self.user_id, %strategy_id, "Saving DCA strategy");
        strategy_id
    }

    pub async fn get_market_data(&self, asset: &str) -> MarketSnapshot {
        MarketSnapshot {
            symbol: asset.to_string(),
            price: dec!(50000.0),
            change_24h: dec!(2.5),
            volume_24h: dec!(1000000000),
            market_cap: dec!(900000000000),
            volatility: 0.05,
        }
    }

    pub async fn log_user_action(&self, action: &str, details: Option<&serde_json::Value>) {
        let details = details.cloned().unwrap_or_else(|| serde_json::json!({}));
        tracing::info!(user_id = self.user_id, action, %details, "User action");
    }
}

/// Deterministic strategy id for a user and asset
pub fn strategy_id(user_id: i64, asset: &str) -> String {
    format!("dca_{user_id}_{asset}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_profile_defaults() {
        let deps = AgentDependencies::new(12);
        let profile = deps.get_user_config().await;
        assert_eq!(profile.preferences.preferred_assets, ["BTC", "ETH"]);
        assert_eq!(profile.risk_tolerance, RiskLevel::Moderate);
        assert_eq!(profile.investment_limits.max_monthly_investment, dec!(5000));

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["experience_level"], "intermediate");
    }

    #[tokio::test]
    async fn test_empty_portfolio() {
        let portfolio = AgentDependencies::new(1).get_user_portfolio().await;
        assert_eq!(portfolio.total_value, Decimal::ZERO);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.active_strategies.is_empty());
    }

    #[tokio::test]
    async fn test_save_strategy_id() {
        let deps = AgentDependencies::new(77);
        assert_eq!(deps.save_dca_strategy("BTC").await, "dca_77_BTC");
        deps.log_user_action("create_dca", None).await;
    }

    #[tokio::test]
    async fn test_market_data_echoes_symbol() {
        let data = AgentDependencies::new(1).get_market_data("SOL").await;
        assert_eq!(data.symbol, "SOL");
        assert_eq!(data.price, dec!(50000));
    }
}

//! Agent Outputs
//!
//! Typed answers the specialized agents must produce. Monetary values are
//! `Decimal`; scores are `f64` bounded to `[0.0, 1.0]`; counts are unsigned.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use agent_core::{
    StructuredOutput,
    error::{AgentError, Result as AgentResult},
    output::ensure_unit_interval,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentRecommendation {
    Buy,
    Hold,
    Sell,
    Avoid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Sideways,
    Volatile,
}

/// Purchase frequency
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DcaInterval {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl DcaInterval {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for DcaInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DcaInterval {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AdvisorError::Validation(format!("unknown interval '{s}'")))
    }
}

/// Lifecycle of a running DCA strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyState {
    Active,
    Paused,
    Completed,
}

// ============================================================================
// Conversation
// ============================================================================

const fn default_confidence() -> f64 {
    0.8
}

/// General conversation reply
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponseOutput {
    pub response: String,

    /// Confidence level (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    #[serde(default)]
    pub suggested_actions: Vec<String>,

    /// Warnings or important notes for the user
    #[serde(default)]
    pub warning_flags: Vec<String>,
}

impl StructuredOutput for AgentResponseOutput {
    const SCHEMA_NAME: &'static str = "AgentResponseOutput";

    fn shape_hint() -> serde_json::Value {
        serde_json::json!({
            "response": "DCA spreads your purchases over time so you never buy everything at the top.",
            "confidence": 0.8,
            "suggested_actions": ["Create a weekly BTC DCA plan"],
            "warning_flags": []
        })
    }

    fn validate(&self) -> AgentResult<()> {
        if self.response.trim().is_empty() {
            return Err(AgentError::invalid_output(
                Self::SCHEMA_NAME,
                "response must not be empty",
            ));
        }
        ensure_unit_interval(Self::SCHEMA_NAME, "confidence", self.confidence)
    }
}

// ============================================================================
// DCA strategy
// ============================================================================

/// A DCA plan for a single asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DCAStrategyOutput {
    pub strategy_id: String,

    /// Target asset symbol
    pub asset: String,

    pub amount_per_interval: Decimal,
    pub interval: DcaInterval,
    pub duration_months: u32,

    // Market analysis
    pub current_price: Decimal,
    pub risk_assessment: RiskLevel,
    pub recommendation: InvestmentRecommendation,

    // Plan
    pub total_investment: Decimal,
    pub expected_purchases: u32,
    pub entry_conditions: Vec<String>,
    pub exit_conditions: Vec<String>,

    /// Stop loss percentage
    #[serde(default)]
    pub stop_loss_threshold: Option<Decimal>,

    /// Take profit percentage
    #[serde(default)]
    pub take_profit_threshold: Option<Decimal>,

    pub explanation: String,

    #[serde(default)]
    pub warnings: Vec<String>,
}

impl StructuredOutput for DCAStrategyOutput {
    const SCHEMA_NAME: &'static str = "DCAStrategyOutput";

    fn shape_hint() -> serde_json::Value {
        serde_json::json!({
            "strategy_id": "dca_123_BTC",
            "asset": "BTC",
            "amount_per_interval": "100",
            "interval": "weekly",
            "duration_months": 12,
            "current_price": "43250.50",
            "risk_assessment": "moderate",
            "recommendation": "buy",
            "total_investment": "4800",
            "expected_purchases": 48,
            "entry_conditions": ["RSI below 70"],
            "exit_conditions": ["Target allocation reached"],
            "stop_loss_threshold": "-20",
            "take_profit_threshold": "200",
            "explanation": "Weekly purchases smooth out BTC volatility over a year.",
            "warnings": ["Crypto assets can lose most of their value"]
        })
    }

    fn validate(&self) -> AgentResult<()> {
        if self.asset.trim().is_empty() {
            return Err(AgentError::invalid_output(Self::SCHEMA_NAME, "asset must not be empty"));
        }
        for (field, value) in [
            ("amount_per_interval", self.amount_per_interval),
            ("current_price", self.current_price),
            ("total_investment", self.total_investment),
        ] {
            if value < Decimal::ZERO {
                return Err(AgentError::invalid_output(
                    Self::SCHEMA_NAME,
                    format!("{field} must not be negative, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Portfolio
// ============================================================================

/// A single asset holding
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub asset: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_percentage: Decimal,
}

/// Progress of one DCA strategy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DCAStrategyStatus {
    pub strategy_id: String,
    pub asset: String,
    pub status: StrategyState,
    pub total_invested: Decimal,
    pub total_quantity: Decimal,
    pub average_price: Decimal,

    #[serde(default)]
    pub next_purchase_date: Option<DateTime<Utc>>,

    /// Performance percentage
    pub performance: Decimal,
}

/// Portfolio overview and risk analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStatusOutput {
    // Overview
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_percentage: Decimal,

    // Positions
    pub positions: Vec<PortfolioPosition>,
    pub position_count: u32,

    // DCA strategies
    pub active_strategies: Vec<DCAStrategyStatus>,
    pub strategy_count: u32,

    // Risk metrics
    pub portfolio_risk: RiskLevel,

    /// Diversification score (0.0-1.0)
    pub diversification_score: f64,

    pub largest_position_percentage: Decimal,

    pub recommendations: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    pub analysis_summary: String,
}

impl StructuredOutput for PortfolioStatusOutput {
    const SCHEMA_NAME: &'static str = "PortfolioStatusOutput";

    fn shape_hint() -> serde_json::Value {
        serde_json::json!({
            "total_value": "10000.00",
            "total_invested": "8500.00",
            "total_pnl": "1500.00",
            "total_pnl_percentage": "17.65",
            "positions": [{
                "asset": "BTC",
                "quantity": "0.2",
                "average_price": "42500.00",
                "current_price": "43250.50",
                "current_value": "8650.10",
                "unrealized_pnl": "150.10",
                "unrealized_pnl_percentage": "1.77"
            }],
            "position_count": 1,
            "active_strategies": [{
                "strategy_id": "dca_123_BTC",
                "asset": "BTC",
                "status": "active",
                "total_invested": "8500.00",
                "total_quantity": "0.2",
                "average_price": "42500.00",
                "next_purchase_date": "2024-01-22T12:00:00Z",
                "performance": "1.77"
            }],
            "strategy_count": 1,
            "portfolio_risk": "moderate",
            "diversification_score": 0.4,
            "largest_position_percentage": "86.50",
            "recommendations": ["Add ETH to reduce concentration"],
            "warnings": ["Single asset above 30% of portfolio"],
            "analysis_summary": "Profitable but concentrated in BTC."
        })
    }

    fn validate(&self) -> AgentResult<()> {
        ensure_unit_interval(
            Self::SCHEMA_NAME,
            "diversification_score",
            self.diversification_score,
        )
    }
}

// ============================================================================
// Market analysis
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicator {
    pub name: String,
    pub value: Decimal,

    /// bullish, bearish or neutral
    pub signal: String,

    pub description: String,
}

/// Support or resistance level
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub level: Decimal,

    /// support or resistance
    #[serde(rename = "type")]
    pub level_type: String,

    /// weak, moderate or strong
    pub strength: String,

    /// Distance from current price as percentage
    pub distance_percentage: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysisOutput {
    // Basic info
    pub asset: String,
    pub current_price: Decimal,
    pub price_change_24h: Decimal,
    pub volume_24h: Decimal,

    #[serde(default)]
    pub market_cap: Option<Decimal>,

    // Trend
    pub trend_direction: TrendDirection,

    /// Trend strength (0.0-1.0)
    pub trend_strength: f64,

    /// Price volatility percentage
    pub volatility: Decimal,

    // Technicals
    pub technical_indicators: Vec<TechnicalIndicator>,
    pub support_levels: Vec<PriceLevel>,
    pub resistance_levels: Vec<PriceLevel>,

    // Investment view
    pub investment_recommendation: InvestmentRecommendation,
    pub dca_suitability: RiskLevel,

    /// Entry bounds keyed `min` / `max`
    pub optimal_entry_range: BTreeMap<String, Decimal>,

    pub risk_factors: Vec<String>,
    pub opportunity_factors: Vec<String>,

    pub best_entry_timing: String,
    pub market_sentiment: String,

    pub detailed_analysis: String,

    /// Analysis confidence (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
}

impl MarketAnalysisOutput {
    /// Entry range from `min` and `max` bounds
    pub fn entry_range(min: Decimal, max: Decimal) -> BTreeMap<String, Decimal> {
        BTreeMap::from([("min".to_string(), min), ("max".to_string(), max)])
    }
}

impl StructuredOutput for MarketAnalysisOutput {
    const SCHEMA_NAME: &'static str = "MarketAnalysisOutput";

    fn shape_hint() -> serde_json::Value {
        serde_json::json!({
            "asset": "BTC",
            "current_price": "43250.50",
            "price_change_24h": "2.3",
            "volume_24h": "25000000000",
            "market_cap": "850000000000",
            "trend_direction": "bullish",
            "trend_strength": 0.7,
            "volatility": "4.2",
            "technical_indicators": [{
                "name": "RSI",
                "value": "65.2",
                "signal": "neutral",
                "description": "RSI indicates neutral momentum"
            }],
            "support_levels": [{
                "level": "41000",
                "type": "support",
                "strength": "strong",
                "distance_percentage": "-5.2"
            }],
            "resistance_levels": [{
                "level": "45000",
                "type": "resistance",
                "strength": "moderate",
                "distance_percentage": "4.0"
            }],
            "investment_recommendation": "buy",
            "dca_suitability": "moderate",
            "optimal_entry_range": {"min": "41000", "max": "43500"},
            "risk_factors": ["Elevated volatility"],
            "opportunity_factors": ["Price above 20-day SMA"],
            "best_entry_timing": "Spread entries over the next four weeks",
            "market_sentiment": "Neutral to bullish",
            "detailed_analysis": "BTC trends up on rising volume with moderate volatility.",
            "confidence_score": 0.7
        })
    }

    fn validate(&self) -> AgentResult<()> {
        ensure_unit_interval(Self::SCHEMA_NAME, "trend_strength", self.trend_strength)?;
        ensure_unit_interval(Self::SCHEMA_NAME, "confidence_score", self.confidence_score)?;

        if let (Some(min), Some(max)) = (
            self.optimal_entry_range.get("min"),
            self.optimal_entry_range.get("max"),
        ) {
            if min > max {
                return Err(AgentError::invalid_output(
                    Self::SCHEMA_NAME,
                    format!("optimal_entry_range min {min} exceeds max {max}"),
                ));
            }
        }
        Ok(())
    }
}

/// Purchases per month used for rough plan totals
pub const PURCHASES_PER_MONTH: u32 = 4;

/// Rough number of purchases and total spend for a plan
pub fn plan_totals(amount_per_interval: Decimal, duration_months: u32) -> (u32, Decimal) {
    let purchases = duration_months.saturating_mul(PURCHASES_PER_MONTH);
    (purchases, amount_per_interval * Decimal::from(purchases))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_shape_hints_parse_and_validate() {
        fn check<O: StructuredOutput>() {
            let hint = O::shape_hint().to_string();
            assert!(O::parse_reply(&hint).is_ok(), "{} hint invalid", O::SCHEMA_NAME);
        }

        check::<AgentResponseOutput>();
        check::<DCAStrategyOutput>();
        check::<PortfolioStatusOutput>();
        check::<MarketAnalysisOutput>();
    }

    #[test]
    fn test_agent_response_defaults() {
        let reply = AgentResponseOutput::parse_reply(r#"{"response": "hi"}"#).unwrap();
        assert!((reply.confidence - 0.8).abs() < f64::EPSILON);
        assert!(reply.suggested_actions.is_empty());
        assert!(reply.warning_flags.is_empty());
    }

    #[test]
    fn test_scores_are_bounded() {
        let err = AgentResponseOutput::parse_reply(r#"{"response": "hi", "confidence": 1.2}"#)
            .unwrap_err();
        assert!(matches!(err, AgentError::OutputValidation { .. }));

        let mut hint = PortfolioStatusOutput::shape_hint();
        hint["diversification_score"] = serde_json::json!(-0.1);
        assert!(PortfolioStatusOutput::parse_reply(&hint.to_string()).is_err());

        let mut hint = MarketAnalysisOutput::shape_hint();
        hint["trend_strength"] = serde_json::json!(1.01);
        assert!(MarketAnalysisOutput::parse_reply(&hint.to_string()).is_err());
    }

    #[test]
    fn test_counts_reject_negative() {
        let mut hint = PortfolioStatusOutput::shape_hint();
        hint["position_count"] = serde_json::json!(-1);
        assert!(PortfolioStatusOutput::parse_reply(&hint.to_string()).is_err());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&RiskLevel::VeryHigh).unwrap(), "\"very_high\"");
        assert_eq!(
            serde_json::to_string(&InvestmentRecommendation::Avoid).unwrap(),
            "\"avoid\""
        );
        assert_eq!("Monthly".parse::<DcaInterval>().unwrap(), DcaInterval::Monthly);
        assert!("hourly".parse::<DcaInterval>().is_err());
    }

    #[test]
    fn test_entry_range_order() {
        let mut hint = MarketAnalysisOutput::shape_hint();
        hint["optimal_entry_range"] = serde_json::json!({"min": "50000", "max": "40000"});
        assert!(MarketAnalysisOutput::parse_reply(&hint.to_string()).is_err());
    }

    #[test]
    fn test_plan_totals() {
        assert_eq!(plan_totals(dec!(100), 12), (48, dec!(4800)));
        assert_eq!(plan_totals(dec!(25.5), 0), (0, dec!(0)));
    }
}

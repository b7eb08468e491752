//! Market data MCP server
//!
//! Tools for the market and DCA agents. Quotes and history come from a
//! [`MarketDataSource`]; indicators, sentiment and volatility are canned.

use agent_core::tool::{ParameterSchema, ToolSchema};
use agent_mcp::{
    ToolHandler,
    protocol::{CallToolResult, Implementation},
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::market::{MarketDataSource, MockMarketData};

pub const SERVER_NAME: &str = "pumppie-market-data-server";

const DEFAULT_DAYS: u32 = 30;
const ANALYSIS_TIMESTAMP: &str = "2024-01-15T12:00:00Z";
const DEFAULT_INDICATORS: [&str; 4] = ["rsi", "sma_20", "ema_12", "volatility"];

pub struct MarketDataServer<S = MockMarketData> {
    source: S,
}

impl Default for MarketDataServer {
    fn default() -> Self {
        Self::new(MockMarketData::new())
    }
}

impl<S: MarketDataSource> MarketDataServer<S> {
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    async fn asset_price(&self, arguments: &Map<String, Value>) -> CallToolResult {
        match self.source.quote(&symbol_arg(arguments, "")).await {
            Ok(quote) => json_result(&quote),
            Err(e) => CallToolResult::error(format!("Error fetching price: {e}")),
        }
    }

    async fn price_history(&self, arguments: &Map<String, Value>) -> CallToolResult {
        let symbol = symbol_arg(arguments, "");
        let days = days_arg(arguments, "days");

        match self.source.price_history(&symbol, days).await {
            Ok(history) => json_result(&json!({
                "symbol": symbol,
                "period_days": days,
                "price_history": history,
            })),
            Err(e) => CallToolResult::error(format!("Error fetching history: {e}")),
        }
    }

    fn technical_indicators(arguments: &Map<String, Value>) -> CallToolResult {
        let requested: Vec<String> = arguments
            .get("indicators")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_else(|| DEFAULT_INDICATORS.map(str::to_string).into());

        let indicators: Map<String, Value> = requested
            .into_iter()
            .map(|name| {
                let value = indicator(&name);
                (name, value)
            })
            .collect();

        json_result(&json!({
            "symbol": symbol_arg(arguments, ""),
            "indicators": indicators,
            "analysis_timestamp": ANALYSIS_TIMESTAMP,
        }))
    }

    fn market_sentiment(arguments: &Map<String, Value>) -> CallToolResult {
        json_result(&json!({
            "symbol": symbol_arg(arguments, "BTC"),
            "overall_sentiment": "neutral_bullish",
            "fear_greed_index": 68,
            "sentiment_score": 0.65,
            "social_mentions": 15420,
            "news_sentiment": "positive",
            "technical_sentiment": "bullish",
            "factors": [
                "Increased institutional interest",
                "Technical breakout patterns",
                "Positive regulatory developments",
                "Growing adoption metrics",
            ],
            "timestamp": ANALYSIS_TIMESTAMP,
        }))
    }

    fn volatility(arguments: &Map<String, Value>) -> CallToolResult {
        json_result(&json!({
            "symbol": symbol_arg(arguments, ""),
            "period_days": days_arg(arguments, "period_days"),
            "volatility_metrics": {
                "historical_volatility": 4.2,
                "volatility_percentile": 65,
                "volatility_trend": "decreasing",
                "risk_level": "moderate",
                "sharpe_ratio": 1.2,
                "max_drawdown": -15.3,
                "value_at_risk_95": -8.5,
            },
            "risk_assessment": {
                "suitable_for_dca": true,
                "risk_adjusted_allocation": 0.15,
                "recommended_position_size": "moderate",
                "warnings": ["High volatility periods may increase DCA efficiency"],
            },
            "timestamp": ANALYSIS_TIMESTAMP,
        }))
    }
}

#[async_trait]
impl<S: MarketDataSource> ToolHandler for MarketDataServer<S> {
    fn info(&self) -> Implementation {
        Implementation {
            name: SERVER_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    fn tools(&self) -> Vec<ToolSchema> {
        let symbol =
            || ParameterSchema::required("symbol", "string", "Asset symbol (e.g., BTC, ETH, ADA)");

        vec![
            ToolSchema {
                name: "get_asset_price".into(),
                description: "Get current price and basic info for a cryptocurrency asset".into(),
                parameters: vec![symbol()],
            },
            ToolSchema {
                name: "get_price_history".into(),
                description: "Get historical price data for technical analysis".into(),
                parameters: vec![
                    symbol(),
                    ParameterSchema::optional(
                        "days",
                        "integer",
                        "Number of days of history to fetch",
                        Some(json!(DEFAULT_DAYS)),
                    ),
                ],
            },
            ToolSchema {
                name: "calculate_technical_indicators".into(),
                description: "Calculate technical indicators (RSI, SMA, EMA, etc.)".into(),
                parameters: vec![
                    symbol(),
                    ParameterSchema::optional(
                        "indicators",
                        "array",
                        "List of indicators to calculate",
                        Some(json!(DEFAULT_INDICATORS)),
                    ),
                ],
            },
            ToolSchema {
                name: "get_market_sentiment".into(),
                description: "Get market sentiment indicators and fear/greed index".into(),
                parameters: vec![ParameterSchema::optional(
                    "symbol",
                    "string",
                    "Asset symbol (optional, for asset-specific sentiment)",
                    Some(json!("BTC")),
                )],
            },
            ToolSchema {
                name: "analyze_volatility".into(),
                description: "Analyze price volatility and risk metrics".into(),
                parameters: vec![
                    symbol(),
                    ParameterSchema::optional(
                        "period_days",
                        "integer",
                        "Analysis period in days",
                        Some(json!(DEFAULT_DAYS)),
                    ),
                ],
            },
        ]
    }

    async fn call(&self, name: &str, arguments: &Map<String, Value>) -> CallToolResult {
        tracing::debug!(tool = name, "Market tool call");

        match name {
            "get_asset_price" => self.asset_price(arguments).await,
            "get_price_history" => self.price_history(arguments).await,
            "calculate_technical_indicators" => Self::technical_indicators(arguments),
            "get_market_sentiment" => Self::market_sentiment(arguments),
            "analyze_volatility" => Self::volatility(arguments),
            other => CallToolResult::text(format!("Unknown tool: {other}")),
        }
    }
}

fn indicator(name: &str) -> Value {
    match name {
        "rsi" => json!({
            "value": 65.2,
            "signal": "neutral",
            "description": "RSI indicates neutral momentum",
        }),
        "sma_20" => json!({
            "value": 43100.0,
            "signal": "bullish",
            "description": "Price above 20-day SMA indicates uptrend",
        }),
        "ema_12" => json!({
            "value": 43180.0,
            "signal": "bullish",
            "description": "Price above 12-day EMA confirms bullish momentum",
        }),
        "volatility" => json!({
            "value": 4.2,
            "signal": "moderate",
            "description": "Volatility is at moderate levels",
        }),
        "macd" => json!({
            "value": 125.5,
            "signal": "bullish",
            "description": "MACD shows bullish divergence",
        }),
        "bollinger_bands" => json!({
            "upper": 45000.0,
            "middle": 43000.0,
            "lower": 41000.0,
            "signal": "neutral",
            "description": "Price within normal Bollinger Bands range",
        }),
        _ => json!({ "value": 0, "signal": "unknown" }),
    }
}

fn symbol_arg(arguments: &Map<String, Value>, default: &str) -> String {
    arguments
        .get("symbol")
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_uppercase()
}

fn days_arg(arguments: &Map<String, Value>, key: &str) -> u32 {
    arguments
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(DEFAULT_DAYS)
}

fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => CallToolResult::error(format!("Serialization error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(name: &str, arguments: Value) -> Value {
        let server = MarketDataServer::default();
        let arguments = arguments.as_object().cloned().unwrap_or_default();
        let result = server.call(name, &arguments).await;
        assert!(!result.is_error);
        serde_json::from_str(&result.joined_text()).unwrap()
    }

    #[test]
    fn test_tool_list() {
        let names: Vec<_> = MarketDataServer::default()
            .tools()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            [
                "get_asset_price",
                "get_price_history",
                "calculate_technical_indicators",
                "get_market_sentiment",
                "analyze_volatility",
            ]
        );
    }

    #[tokio::test]
    async fn test_asset_price() {
        let quote = call("get_asset_price", json!({"symbol": "sol"})).await;
        assert_eq!(quote["symbol"], "SOL");
        assert_eq!(quote["current_price"], "105.20");
        assert_eq!(quote["timestamp"], "2024-01-15T12:00:00Z");
    }

    #[tokio::test]
    async fn test_price_history_defaults_to_thirty_days() {
        let history = call("get_price_history", json!({"symbol": "BTC"})).await;
        assert_eq!(history["period_days"], 30);
        assert_eq!(history["price_history"].as_array().unwrap().len(), 30);
        assert_eq!(history["price_history"][29]["date"], "2024-01-15");
    }

    #[tokio::test]
    async fn test_indicators() {
        let defaults = call("calculate_technical_indicators", json!({"symbol": "BTC"})).await;
        let keys: Vec<_> = defaults["indicators"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(defaults["indicators"]["rsi"]["value"], 65.2);

        let custom = call(
            "calculate_technical_indicators",
            json!({"symbol": "BTC", "indicators": ["macd", "ichimoku"]}),
        )
        .await;
        assert_eq!(custom["indicators"]["macd"]["signal"], "bullish");
        assert_eq!(custom["indicators"]["ichimoku"]["signal"], "unknown");
    }

    #[tokio::test]
    async fn test_sentiment_and_volatility() {
        let sentiment = call("get_market_sentiment", json!({})).await;
        assert_eq!(sentiment["symbol"], "BTC");
        assert_eq!(sentiment["fear_greed_index"], 68);

        let volatility = call("analyze_volatility", json!({"symbol": "eth", "period_days": 7})).await;
        assert_eq!(volatility["period_days"], 7);
        assert_eq!(volatility["risk_assessment"]["suitable_for_dca"], true);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = MarketDataServer::default().call("buy_now", &Map::new()).await;
        assert_eq!(result.joined_text(), "Unknown tool: buy_now");
    }
}

//! Market Data
//!
//! Sources of prices for the market tool server.

mod mock;

pub use mock::MockMarketData;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Longest price history a source will return
pub const MAX_HISTORY_DAYS: u32 = 365;

/// Spot price snapshot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub current_price: Decimal,

    /// 24h change in percent
    pub price_change_24h: Decimal,

    pub volume_24h: Decimal,
    pub market_cap: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// One day of history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
    pub volume: u64,
}

/// Price source (Strategy pattern)
///
/// Implement this for CoinGecko, CoinMarketCap, an exchange feed, etc.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Current price for a symbol
    async fn quote(&self, symbol: &str) -> Result<Quote>;

    /// Daily prices, oldest first, ending at the quote date
    async fn price_history(&self, symbol: &str, days: u32) -> Result<Vec<PricePoint>>;

    async fn health_check(&self) -> bool;

    fn name(&self) -> &str;
}

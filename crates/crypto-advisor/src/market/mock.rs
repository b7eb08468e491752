//! Mock Market Data
//!
//! Static quotes pinned to a fixed timestamp, and a seeded random walk for
//! history so the same symbol always yields the same series.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{MAX_HISTORY_DAYS, MarketDataSource, PricePoint, Quote};
use crate::error::Result;

/// Largest simulated daily move (±5%)
const MAX_DAILY_CHANGE: f64 = 0.05;
const MIN_VOLUME: u64 = 1_000_000;
const VOLUME_SPAN: f64 = 49_000_000.0;

pub struct MockMarketData {
    as_of: DateTime<Utc>,
}

impl Default for MockMarketData {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            as_of: Utc
                .with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    pub const fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// (price, 24h change %, 24h volume, market cap)
    fn base(symbol: &str) -> (Decimal, Decimal, Decimal, Decimal) {
        match symbol {
            "BTC" => (dec!(43250.50), dec!(2.3), dec!(25000000000), dec!(850000000000)),
            "ETH" => (dec!(2580.75), dec!(-1.2), dec!(15000000000), dec!(310000000000)),
            "ADA" => (dec!(0.45), dec!(5.1), dec!(800000000), dec!(16000000000)),
            "SOL" => (dec!(105.20), dec!(3.8), dec!(2500000000), dec!(47000000000)),
            _ => (dec!(1.0), dec!(0.0), dec!(1000000), dec!(1000000000)),
        }
    }
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let (current_price, price_change_24h, volume_24h, market_cap) = Self::base(&symbol);

        Ok(Quote {
            symbol,
            current_price,
            price_change_24h,
            volume_24h,
            market_cap,
            timestamp: self.as_of,
        })
    }

    async fn price_history(&self, symbol: &str, days: u32) -> Result<Vec<PricePoint>> {
        let symbol = symbol.to_uppercase();
        let days = days.min(MAX_HISTORY_DAYS);
        let (base_price, ..) = Self::base(&symbol);

        let mut walk = SeededWalk::new(&symbol);
        let mut price = base_price;
        let end = self.as_of.date_naive();

        let history = (0..days)
            .map(|i| {
                let change = (walk.next_unit() - 0.5) * 2.0 * MAX_DAILY_CHANGE;
                let factor = Decimal::from_f64_retain(1.0 + change).unwrap_or(Decimal::ONE);
                price = (price * factor).round_dp(8);

                PricePoint {
                    date: end - Duration::days(i64::from(days - 1 - i)),
                    price: price.round_dp(2),
                    volume: walk.next_volume(),
                }
            })
            .collect();

        Ok(history)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "MockMarketData"
    }
}

/// Linear congruential generator seeded from the symbol
struct SeededWalk(u64);

impl SeededWalk {
    fn new(symbol: &str) -> Self {
        // FNV-1a
        let seed = symbol.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, b| {
            (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
        Self(seed)
    }

    /// Uniform value in [0, 1)
    #[allow(clippy::cast_precision_loss)]
    fn next_unit(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1_u64 << 53) as f64
    }

    /// Daily volume in [1e6, 5e7)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn next_volume(&mut self) -> u64 {
        MIN_VOLUME + (self.next_unit() * VOLUME_SPAN) as u64
    }
}

// =============================================================================
// Market data: candle type and the fetch seam used by the trading loop
// =============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BotResult;

/// A closed candle reduced to what the indicators need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub close_time: DateTime<Utc>,
    pub close: f64,
}

impl Candle {
    pub fn new(close_time: DateTime<Utc>, close: f64) -> Self {
        Self { close_time, close }
    }
}

/// What to fetch on each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleRequest {
    pub symbol: String,
    pub interval: String,
    pub limit: u32,
}

impl std::fmt::Display for CandleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}x{}", self.symbol, self.interval, self.limit)
    }
}

/// Anything that can hand back an oldest-first candle series.
///
/// Transport and parse problems surface as `BotError::Fetch`.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_candles(&self, request: &CandleRequest) -> BotResult<Vec<Candle>>;
}

/// Close prices in series order.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

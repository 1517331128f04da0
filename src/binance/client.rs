// =============================================================================
// Binance REST API Client: public kline endpoint
// =============================================================================
//
// Only the unauthenticated market-data endpoint is used; orders go to the
// derivatives exchange through `crate::delta`.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, instrument, warn};

use crate::error::{BotError, BotResult};
use crate::market_data::{Candle, CandleRequest, MarketDataSource};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Index of the close price in a kline array.
const KLINE_CLOSE: usize = 4;
/// Index of the close time (epoch ms) in a kline array.
const KLINE_CLOSE_TIME: usize = 6;

/// Binance public market-data client.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceClient {
    /// Create a client against `base_url` (e.g. `https://api.binance.com`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET /api/v3/klines (public, no signature required).
    ///
    /// Array indices:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, ...
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("interval", interval), ("limit", limit.as_str())])
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_candles(&self, request: &CandleRequest) -> BotResult<Vec<Candle>> {
        self.get_klines(&request.symbol, &request.interval, request.limit)
            .await
            .map_err(|e| BotError::Fetch(format!("{e:#}")))
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Parsing
// -----------------------------------------------------------------------------

/// Turn Binance's array-of-arrays kline payload into candles sorted by close
/// time.  Short rows are skipped; bad numbers fail the whole batch.
pub fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() <= KLINE_CLOSE_TIME {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let close = parse_str_f64(&arr[KLINE_CLOSE])?;
        if !close.is_finite() {
            anyhow::bail!("non-finite close price: {close}");
        }

        let close_ms = arr[KLINE_CLOSE_TIME]
            .as_i64()
            .with_context(|| format!("close time is not an integer: {}", arr[KLINE_CLOSE_TIME]))?;
        let close_time = DateTime::from_timestamp_millis(close_ms)
            .with_context(|| format!("close time out of range: {close_ms}"))?;

        candles.push(Candle::new(close_time, close));
    }

    candles.sort_by_key(|c| c.close_time);
    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

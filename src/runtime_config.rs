// =============================================================================
// Runtime Configuration: bot settings and exchange credentials
// =============================================================================
//
// Settings come from an optional JSON file, then environment overrides.  All
// fields carry `#[serde(default)]` so a partial file still loads.  Every
// problem found here is a `BotError::Config`, which is fatal: the loop never
// starts on a bad configuration.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BotError, BotResult};
use crate::execution::OrderSettings;
use crate::indicators::IndicatorParams;
use crate::market_data::CandleRequest;
use crate::strategy::SignalThresholds;
use crate::types::AccountMode;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_candle_limit() -> u32 {
    100
}

fn default_product_id() -> u64 {
    2
}

fn default_trade_size() -> f64 {
    0.001
}

fn default_ema_fast_span() -> usize {
    9
}

fn default_ema_slow_span() -> usize {
    21
}

fn default_rsi_period() -> usize {
    14
}

fn default_buy_rsi_ceiling() -> f64 {
    60.0
}

fn default_sell_rsi_floor() -> f64 {
    40.0
}

fn default_tick_interval_secs() -> u64 {
    30
}

fn default_market_data_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_exchange_url() -> String {
    "https://cdn-ind.testnet.deltaex.org".to_string()
}

fn default_order_path() -> String {
    "/v2/orders".to_string()
}

fn default_client_order_prefix() -> String {
    "testbot".to_string()
}

// =============================================================================
// BotConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    // --- Market data ---------------------------------------------------------

    /// Instrument polled for candles, e.g. "BTCUSDT".
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Candle granularity, e.g. "5m".
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Number of candles fetched per tick.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,

    #[serde(default = "default_market_data_url")]
    pub market_data_url: String,

    // --- Indicators & classifier ---------------------------------------------

    #[serde(default = "default_ema_fast_span")]
    pub ema_fast_span: usize,

    #[serde(default = "default_ema_slow_span")]
    pub ema_slow_span: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// BUY needs RSI strictly below this.
    #[serde(default = "default_buy_rsi_ceiling")]
    pub buy_rsi_ceiling: f64,

    /// SELL needs RSI strictly above this.
    #[serde(default = "default_sell_rsi_floor")]
    pub sell_rsi_floor: f64,

    // --- Orders --------------------------------------------------------------

    /// Exchange product id the orders are placed on.
    #[serde(default = "default_product_id")]
    pub product_id: u64,

    /// Order size in contract units.
    #[serde(default = "default_trade_size")]
    pub trade_size: f64,

    #[serde(default = "default_exchange_url")]
    pub exchange_url: String,

    #[serde(default = "default_order_path")]
    pub order_path: String,

    #[serde(default = "default_client_order_prefix")]
    pub client_order_prefix: String,

    /// `Demo` signs orders without sending them.
    #[serde(default)]
    pub account_mode: AccountMode,

    // --- Loop ----------------------------------------------------------------

    /// Idle time between ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            interval: default_interval(),
            candle_limit: default_candle_limit(),
            market_data_url: default_market_data_url(),
            ema_fast_span: default_ema_fast_span(),
            ema_slow_span: default_ema_slow_span(),
            rsi_period: default_rsi_period(),
            buy_rsi_ceiling: default_buy_rsi_ceiling(),
            sell_rsi_floor: default_sell_rsi_floor(),
            product_id: default_product_id(),
            trade_size: default_trade_size(),
            exchange_url: default_exchange_url(),
            order_path: default_order_path(),
            client_order_prefix: default_client_order_prefix(),
            account_mode: AccountMode::default(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl BotConfig {
    /// Load from a JSON file.  A missing file falls back to defaults with a
    /// warning; an unreadable or malformed one is a config error.
    pub fn load(path: impl AsRef<Path>) -> BotResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            BotError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BotError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        info!(path = %path.display(), symbol = %config.symbol, "bot config loaded");
        Ok(config)
    }

    /// Apply `BOT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> BotResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> BotResult<()> {
        if let Some(sym) = lookup("BOT_SYMBOL") {
            let sym = sym.trim().to_uppercase();
            if !sym.is_empty() {
                self.symbol = sym;
            }
        }
        if let Some(interval) = lookup("BOT_INTERVAL") {
            let interval = interval.trim();
            if !interval.is_empty() {
                self.interval = interval.to_string();
            }
        }
        if let Some(size) = lookup("BOT_TRADE_SIZE") {
            self.trade_size = size
                .trim()
                .parse()
                .map_err(|e| BotError::Config(format!("BOT_TRADE_SIZE '{size}': {e}")))?;
        }
        if let Some(secs) = lookup("BOT_TICK_SECS") {
            self.tick_interval_secs = secs
                .trim()
                .parse()
                .map_err(|e| BotError::Config(format!("BOT_TICK_SECS '{secs}': {e}")))?;
        }
        if let Some(flag) = lookup("BOT_DRY_RUN") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.account_mode = AccountMode::Demo,
                "0" | "false" | "no" | "" => self.account_mode = AccountMode::Live,
                other => {
                    return Err(BotError::Config(format!("BOT_DRY_RUN '{other}' is not a boolean")));
                }
            }
        }
        Ok(())
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> BotResult<()> {
        let fail = |msg: String| Err(BotError::Config(msg));

        if self.symbol.trim().is_empty() {
            return fail("symbol must not be empty".into());
        }
        if self.interval.trim().is_empty() {
            return fail("interval must not be empty".into());
        }
        if self.ema_fast_span == 0 || self.ema_slow_span == 0 || self.rsi_period == 0 {
            return fail("EMA spans and RSI period must be positive".into());
        }
        if self.ema_fast_span >= self.ema_slow_span {
            return fail(format!(
                "ema_fast_span ({}) must be below ema_slow_span ({})",
                self.ema_fast_span, self.ema_slow_span
            ));
        }
        let needed = self.ema_slow_span.max(self.rsi_period + 1);
        if (self.candle_limit as usize) < needed {
            return fail(format!(
                "candle_limit ({}) must be at least {needed} for the indicators to be defined",
                self.candle_limit
            ));
        }
        if !self.trade_size.is_finite() || self.trade_size <= 0.0 {
            return fail(format!("trade_size must be positive, got {}", self.trade_size));
        }
        for (name, v) in [
            ("buy_rsi_ceiling", self.buy_rsi_ceiling),
            ("sell_rsi_floor", self.sell_rsi_floor),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return fail(format!("{name} must be within [0, 100], got {v}"));
            }
        }
        if self.tick_interval_secs == 0 {
            return fail("tick_interval_secs must be positive".into());
        }
        if !self.order_path.starts_with('/') {
            return fail(format!("order_path must start with '/', got {}", self.order_path));
        }
        Ok(())
    }

    // --- Views for the components -------------------------------------------

    pub fn candle_request(&self) -> CandleRequest {
        CandleRequest {
            symbol: self.symbol.clone(),
            interval: self.interval.clone(),
            limit: self.candle_limit,
        }
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            fast_span: self.ema_fast_span,
            slow_span: self.ema_slow_span,
            rsi_period: self.rsi_period,
        }
    }

    pub fn thresholds(&self) -> SignalThresholds {
        SignalThresholds {
            buy_rsi_ceiling: self.buy_rsi_ceiling,
            sell_rsi_floor: self.sell_rsi_floor,
        }
    }

    pub fn order_settings(&self) -> OrderSettings {
        OrderSettings {
            product_id: self.product_id,
            trade_size: self.trade_size,
            order_path: self.order_path.clone(),
            account_mode: self.account_mode,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Exchange API credentials.  Both are required before the loop may start.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BotError::Config(format!("{key} is not set")))
        };

        Ok(Self {
            api_key: require("API_KEY")?,
            api_secret: require("API_SECRET")?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.interval, "5m");
        assert!((cfg.trade_size - 0.001).abs() < f64::EPSILON);
        assert_eq!(cfg.ema_fast_span, 9);
        assert_eq!(cfg.ema_slow_span, 21);
        assert_eq!(cfg.rsi_period, 14);
        assert_eq!(cfg.tick_interval(), Duration::from_secs(30));
        assert_eq!(cfg.account_mode, AccountMode::Live);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: BotConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.candle_limit, 100);
        assert_eq!(cfg.order_path, "/v2/orders");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbol": "ETHUSDT", "account_mode": "Demo", "tick_interval_secs": 5 }"#;
        let cfg: BotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbol, "ETHUSDT");
        assert_eq!(cfg.account_mode, AccountMode::Demo);
        assert_eq!(cfg.tick_interval_secs, 5);
        assert_eq!(cfg.ema_slow_span, 21);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = BotConfig::load("/definitely/not/here/bot_config.json").unwrap();
        assert_eq!(cfg.symbol, "BTCUSDT");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let path = std::env::temp_dir().join(format!("bot_config_{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = BotConfig::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = BotConfig::default();
        cfg.apply_overrides(env(&[
            ("BOT_SYMBOL", " ethusdt "),
            ("BOT_INTERVAL", "1m"),
            ("BOT_TRADE_SIZE", "0.25"),
            ("BOT_TICK_SECS", "10"),
            ("BOT_DRY_RUN", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.symbol, "ETHUSDT");
        assert_eq!(cfg.interval, "1m");
        assert!((cfg.trade_size - 0.25).abs() < f64::EPSILON);
        assert_eq!(cfg.tick_interval_secs, 10);
        assert_eq!(cfg.account_mode, AccountMode::Demo);
    }

    #[test]
    fn bad_env_override_is_config_error() {
        let mut cfg = BotConfig::default();
        let err = cfg.apply_overrides(env(&[("BOT_TRADE_SIZE", "lots")])).unwrap_err();
        assert_eq!(err.kind(), "config");
        let err = cfg.apply_overrides(env(&[("BOT_DRY_RUN", "maybe")])).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn validate_rejects_inverted_spans() {
        let cfg = BotConfig {
            ema_fast_span: 21,
            ema_slow_span: 9,
            ..BotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_too_few_candles() {
        // The source fetched 20 candles, which never satisfies a 21 span.
        let cfg = BotConfig {
            candle_limit: 20,
            ..BotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_size_and_thresholds() {
        for cfg in [
            BotConfig { trade_size: 0.0, ..BotConfig::default() },
            BotConfig { trade_size: f64::NAN, ..BotConfig::default() },
            BotConfig { buy_rsi_ceiling: 120.0, ..BotConfig::default() },
            BotConfig { tick_interval_secs: 0, ..BotConfig::default() },
            BotConfig { order_path: "v2/orders".into(), ..BotConfig::default() },
        ] {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn views_follow_config() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.indicator_params(), IndicatorParams::default());
        assert_eq!(cfg.thresholds(), SignalThresholds::default());
        let req = cfg.candle_request();
        assert_eq!(req.symbol, "BTCUSDT");
        assert_eq!(req.limit, 100);
        assert_eq!(cfg.order_settings().product_id, 2);
    }

    #[test]
    fn credentials_require_both_values() {
        let creds = Credentials::from_lookup(env(&[("API_KEY", "k"), ("API_SECRET", "s")])).unwrap();
        assert_eq!(creds.api_key, "k");
        assert_eq!(creds.api_secret, "s");

        let err = Credentials::from_lookup(env(&[("API_KEY", "k")])).unwrap_err();
        assert_eq!(err, BotError::Config("API_SECRET is not set".into()));

        let err = Credentials::from_lookup(env(&[("API_KEY", "  "), ("API_SECRET", "s")])).unwrap_err();
        assert_eq!(err, BotError::Config("API_KEY is not set".into()));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::from_lookup(env(&[("API_KEY", "key-123"), ("API_SECRET", "sec-456")])).unwrap();
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("key-123"));
        assert!(!dbg.contains("sec-456"));
    }
}

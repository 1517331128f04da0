// =============================================================================
// Signal Bot: Main Entry Point
// =============================================================================
//
// Polls candles for one instrument, classifies an EMA-crossover + RSI signal,
// and places a signed market order whenever the signal changes.  Credentials
// and configuration are checked before the first tick; after that nothing
// short of Ctrl+C stops the loop.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod binance;
mod delta;
mod error;
mod execution;
mod indicators;
mod market_data;
mod runtime_config;
mod strategy;
mod trading_loop;
mod types;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::binance::BinanceClient;
use crate::delta::{ClientOrderIds, DeltaClient, OrderSigner};
use crate::execution::ExecutionEngine;
use crate::runtime_config::{BotConfig, Credentials};
use crate::trading_loop::TradingLoop;

const CONFIG_PATH: &str = "bot_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Signal bot starting up");

    let mut config = BotConfig::load(CONFIG_PATH)?;
    config.apply_env()?;
    config.validate()?;
    let credentials = Credentials::from_env()?;

    info!(
        symbol = %config.symbol,
        interval = %config.interval,
        trade_size = config.trade_size,
        ema_fast = config.ema_fast_span,
        ema_slow = config.ema_slow_span,
        rsi_period = config.rsi_period,
        tick_secs = config.tick_interval_secs,
        account_mode = %config.account_mode,
        "configuration accepted"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let market = Arc::new(BinanceClient::new(config.market_data_url.clone())?);
    let gateway = Arc::new(DeltaClient::new(
        credentials.api_key.clone(),
        config.exchange_url.clone(),
    )?);

    let engine = ExecutionEngine::new(
        gateway,
        OrderSigner::new(credentials.api_secret.clone()),
        ClientOrderIds::new(config.client_order_prefix.clone()),
        config.order_settings(),
    );

    let bot = TradingLoop::new(
        market,
        engine,
        config.candle_request(),
        config.indicator_params(),
        config.thresholds(),
        config.tick_interval(),
    );

    // ── 3. Run until Ctrl+C ──────────────────────────────────────────────
    let final_state = bot
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(last_signal = ?final_state.last_signal, "Signal bot shut down complete.");
    Ok(())
}

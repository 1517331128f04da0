// =============================================================================
// Trading Loop: fetch, classify, debounce, dispatch, sleep, repeat
// =============================================================================
//
// State is a single value, the side of the last order the exchange accepted.
// It is passed into each tick and handed back out, never kept in a global:
//
//   signal HOLD                   -> no dispatch, state unchanged
//   signal == last_signal         -> no dispatch, state unchanged
//   signal BUY/SELL, changed      -> dispatch
//       dispatch ok               -> last_signal = signal
//       dispatch failed           -> state unchanged (retried next tick)
//
// Every failure is contained in its tick.  The driver itself never fails.
// =============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{BotError, BotResult};
use crate::execution::{ExecutionEngine, ExecutionResult};
use crate::indicators::{compute_snapshot, IndicatorParams, IndicatorSnapshot};
use crate::market_data::{closes, Candle, CandleRequest, MarketDataSource};
use crate::strategy::{classify, SignalThresholds};
use crate::types::{Side, Signal};

// =============================================================================
// Loop state
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopState {
    /// Side of the last successfully dispatched order.  HOLD is never stored.
    pub last_signal: Option<Side>,
}

impl LoopState {
    /// The side to dispatch for `signal`, if any.  Only BUY/SELL take part in
    /// the comparison against `last_signal`.
    pub fn actionable(&self, signal: Signal) -> Option<Side> {
        let side = signal.side()?;
        (self.last_signal != Some(side)).then_some(side)
    }

    /// State after a dispatch for `side` was accepted.
    pub fn after_dispatch(self, side: Side) -> Self {
        Self {
            last_signal: Some(side),
        }
    }
}

// =============================================================================
// Tick outcome
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// Classifier said HOLD.
    NoSignal,
    /// Same side as the last accepted order.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Dispatched {
        side: Side,
        snapshot: IndicatorSnapshot,
        result: ExecutionResult,
    },
    Held {
        signal: Signal,
        snapshot: IndicatorSnapshot,
        reason: HoldReason,
    },
    Failed(BotError),
}

impl TickOutcome {
    /// One log line per tick.
    pub fn report(&self, tick: u64) {
        match self {
            Self::Dispatched {
                side,
                snapshot,
                result,
            } => info!(
                tick,
                side = %side,
                ema_fast = snapshot.ema_fast,
                ema_slow = snapshot.ema_slow,
                rsi = snapshot.rsi,
                client_order_id = %result.client_order_id(),
                result = %result,
                "signal changed, order dispatched"
            ),
            Self::Held {
                signal,
                snapshot,
                reason,
            } => info!(
                tick,
                signal = %signal,
                reason = ?reason,
                ema_fast = snapshot.ema_fast,
                ema_slow = snapshot.ema_slow,
                rsi = snapshot.rsi,
                "holding"
            ),
            Self::Failed(e @ BotError::InsufficientData { .. }) => {
                warn!(tick, kind = e.kind(), error = %e, "tick skipped")
            }
            Self::Failed(e) => error!(tick, kind = e.kind(), error = %e, "tick failed"),
        }
    }
}

/// Indicators and classification for one candle series.
pub fn evaluate(
    candles: &[Candle],
    params: &IndicatorParams,
    thresholds: &SignalThresholds,
) -> BotResult<(IndicatorSnapshot, Signal)> {
    let snapshot = compute_snapshot(&closes(candles), params)?;
    Ok((snapshot, classify(&snapshot, thresholds)))
}

// =============================================================================
// Loop
// =============================================================================

pub struct TradingLoop {
    market: Arc<dyn MarketDataSource>,
    engine: ExecutionEngine,
    request: CandleRequest,
    params: IndicatorParams,
    thresholds: SignalThresholds,
    tick_interval: Duration,
}

impl TradingLoop {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        engine: ExecutionEngine,
        request: CandleRequest,
        params: IndicatorParams,
        thresholds: SignalThresholds,
        tick_interval: Duration,
    ) -> Self {
        Self {
            market,
            engine,
            request,
            params,
            thresholds,
            tick_interval,
        }
    }

    /// Run one tick to completion and return the next state with its outcome.
    pub async fn tick(&self, state: LoopState) -> (LoopState, TickOutcome) {
        let candles = match self.market.fetch_candles(&self.request).await {
            Ok(c) => c,
            Err(e) => return (state, TickOutcome::Failed(e)),
        };

        let (snapshot, signal) = match evaluate(&candles, &self.params, &self.thresholds) {
            Ok(v) => v,
            Err(e) => return (state, TickOutcome::Failed(e)),
        };

        let Some(side) = state.actionable(signal) else {
            let reason = if signal == Signal::Hold {
                HoldReason::NoSignal
            } else {
                HoldReason::Unchanged
            };
            return (
                state,
                TickOutcome::Held {
                    signal,
                    snapshot,
                    reason,
                },
            );
        };

        match self.engine.execute_signal(side).await {
            Ok(result) => (
                state.after_dispatch(side),
                TickOutcome::Dispatched {
                    side,
                    snapshot,
                    result,
                },
            ),
            Err(e) => (state, TickOutcome::Failed(e)),
        }
    }

    /// Tick forever, sleeping `tick_interval` between ticks, until `shutdown`
    /// resolves.  Returns the final state.
    pub async fn run<F>(&self, shutdown: F) -> LoopState
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            market = %self.request,
            tick_secs = self.tick_interval.as_secs_f64(),
            account_mode = %self.engine.settings().account_mode,
            "trading loop started"
        );

        let mut state = LoopState::default();
        let mut tick: u64 = 0;

        loop {
            tick += 1;

            let (next, outcome) = tokio::select! {
                _ = &mut shutdown => break,
                res = self.tick(state) => res,
            };
            state = next;
            outcome.report(tick);
            info!(tick, last_signal = ?state.last_signal, "still alive");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.tick_interval) => {}
            }
        }

        warn!(ticks = tick, last_signal = ?state.last_signal, "trading loop stopped");
        state
    }
}

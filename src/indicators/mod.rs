// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations.  Series functions return
// a (possibly empty) `Vec`; the `latest_*` helpers surface
// `BotError::InsufficientData` so callers cannot classify on a number that
// was computed from too few samples.

pub mod ema;
pub mod rsi;

use serde::Serialize;

use crate::error::{BotError, BotResult};

/// Look-back parameters for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub fast_span: usize,
    pub slow_span: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            fast_span: 9,
            slow_span: 21,
            rsi_period: 14,
        }
    }
}

/// Latest indicator values, recomputed every tick from the full close series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
}

/// Build a snapshot from an oldest-first close series.
///
/// Fails with `InsufficientData` when the series is empty or too short for
/// any of the three indicators.
pub fn compute_snapshot(closes: &[f64], params: &IndicatorParams) -> BotResult<IndicatorSnapshot> {
    if closes.is_empty() {
        return Err(BotError::insufficient("closes", 1, 0));
    }

    let ema_fast = ema::latest_ema(closes, params.fast_span, "ema_fast")?;
    let ema_slow = ema::latest_ema(closes, params.slow_span, "ema_slow")?;
    let rsi = rsi::latest_rsi(closes, params.rsi_period)?;

    Ok(IndicatorSnapshot {
        ema_fast,
        ema_slow,
        rsi,
    })
}

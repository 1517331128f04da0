// =============================================================================
// Relative Strength Index (RSI): simple trailing mean
// =============================================================================
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Over the trailing `period` deltas, average the gains and the
//          (negated) losses.  Both averages divide by `period`.
// Step 3: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Zero average loss means the window had no down moves and RSI is 100.  This
// includes a perfectly flat window.
// =============================================================================

use crate::error::{BotError, BotResult};

/// Compute the rolling RSI series for `closes`.
///
/// One value per close starting at index `period`, i.e. the output length is
/// `closes.len() - period`.  Empty when `period == 0` or fewer than
/// `period + 1` closes are supplied.  Truncated at the first non-finite value.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut result = Vec::with_capacity(deltas.len() + 1 - period);
    for window in deltas.windows(period) {
        match rsi_from_window(window) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// RSI over the last `period` deltas of `closes`, or `InsufficientData` when
/// fewer than `period + 1` closes are available.
pub fn latest_rsi(closes: &[f64], period: usize) -> BotResult<f64> {
    let needed = period.max(1) + 1;
    if closes.len() < needed {
        return Err(BotError::insufficient("rsi", needed, closes.len()));
    }

    let tail = &closes[closes.len() - needed..];
    calculate_rsi(tail, period.max(1))
        .last()
        .copied()
        .ok_or_else(|| BotError::insufficient("rsi", needed, 0))
}

// =============================================================================
// Internal helpers
// =============================================================================

/// RSI for one window of deltas.  `None` when any delta (or the result) is
/// non-finite.
fn rsi_from_window(deltas: &[f64]) -> Option<f64> {
    if deltas.is_empty() || deltas.iter().any(|d| !d.is_finite()) {
        return None;
    }

    let n = deltas.len() as f64;
    let (gains, losses) = deltas.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });
    let avg_gain = gains / n;
    let avg_loss = losses / n;

    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

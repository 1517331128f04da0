// =============================================================================
// Signal Classifier
// =============================================================================
//
// Maps the latest indicator snapshot to BUY / SELL / HOLD:
//
//   BUY   iff ema_fast > ema_slow  and  rsi < buy_rsi_ceiling   (default 60)
//   SELL  iff ema_fast < ema_slow  and  rsi > sell_rsi_floor    (default 40)
//   HOLD  otherwise, including ema_fast == ema_slow
//
// The RSI bound confirms the crossover: a fast EMA above the slow one with an
// already stretched RSI is left alone.
// =============================================================================

use crate::indicators::IndicatorSnapshot;
use crate::types::Signal;

/// RSI confirmation bounds for the crossover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub buy_rsi_ceiling: f64,
    pub sell_rsi_floor: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            buy_rsi_ceiling: 60.0,
            sell_rsi_floor: 40.0,
        }
    }
}

/// Pure classification; identical inputs always give the same signal.
pub fn classify(snapshot: &IndicatorSnapshot, thresholds: &SignalThresholds) -> Signal {
    let IndicatorSnapshot {
        ema_fast,
        ema_slow,
        rsi,
    } = *snapshot;

    if ema_fast > ema_slow && rsi < thresholds.buy_rsi_ceiling {
        Signal::Buy
    } else if ema_fast < ema_slow && rsi > thresholds.sell_rsi_floor {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn classify_default(snapshot: &IndicatorSnapshot) -> Signal {
        classify(snapshot, &SignalThresholds::default())
    }

    fn snap(ema_fast: f64, ema_slow: f64, rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_fast,
            ema_slow,
            rsi,
        }
    }

    #[test]
    fn bullish_cross_with_room_is_buy() {
        assert_eq!(classify_default(&snap(105.0, 100.0, 55.0)), Signal::Buy);
    }

    #[test]
    fn bearish_cross_with_room_is_sell() {
        assert_eq!(classify_default(&snap(95.0, 100.0, 45.0)), Signal::Sell);
    }

    #[test]
    fn overbought_bullish_cross_holds() {
        assert_eq!(classify_default(&snap(105.0, 100.0, 60.0)), Signal::Hold);
        assert_eq!(classify_default(&snap(105.0, 100.0, 85.0)), Signal::Hold);
    }

    #[test]
    fn oversold_bearish_cross_holds() {
        assert_eq!(classify_default(&snap(95.0, 100.0, 40.0)), Signal::Hold);
        assert_eq!(classify_default(&snap(95.0, 100.0, 12.0)), Signal::Hold);
    }

    #[test]
    fn equal_emas_always_hold() {
        for rsi in [0.0, 25.0, 40.0, 50.0, 60.0, 75.0, 100.0] {
            assert_eq!(classify_default(&snap(100.0, 100.0, rsi)), Signal::Hold, "rsi {rsi}");
        }
    }

    #[test]
    fn classification_is_pure() {
        let s = snap(101.3, 100.9, 47.2);
        let first = classify_default(&s);
        for _ in 0..10 {
            assert_eq!(classify_default(&s), first);
        }
    }

    #[test]
    fn custom_thresholds_are_respected() {
        let tight = SignalThresholds {
            buy_rsi_ceiling: 50.0,
            sell_rsi_floor: 50.0,
        };
        assert_eq!(classify(&snap(105.0, 100.0, 55.0), &tight), Signal::Hold);
        assert_eq!(classify(&snap(95.0, 100.0, 55.0), &tight), Signal::Sell);
    }
}

// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   alpha  = 2 / (span + 1)
//   EMA_0  = close_0
//   EMA_t  = close_t * alpha + EMA_{t-1} * (1 - alpha)
//
// The recursion is seeded with the first close, so a value exists from the
// first observation on.  It is not trusted until `span` closes have been
// folded in; `latest_ema` enforces that.
// =============================================================================

use crate::error::{BotError, BotResult};

/// Compute the EMA series for `closes` with smoothing `span`.
///
/// The output has one element per input close.  Returns an empty `Vec` when
/// the input is empty or `span` is zero.  If a non-finite value shows up the
/// series is truncated at that point.
pub fn calculate_ema(closes: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return Vec::new();
    }
    let Some((&first, rest)) = closes.split_first() else {
        return Vec::new();
    };
    if !first.is_finite() {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);

    let mut result = Vec::with_capacity(closes.len());
    result.push(first);

    let mut prev = first;
    for &close in rest {
        let ema = close * alpha + prev * (1.0 - alpha);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev = ema;
    }

    result
}

/// Most recent EMA value, or `InsufficientData` when fewer than `span`
/// closes are available (or the series broke on a non-finite value).
pub fn latest_ema(closes: &[f64], span: usize, label: &'static str) -> BotResult<f64> {
    let needed = span.max(1);
    if closes.len() < needed {
        return Err(BotError::insufficient(label, needed, closes.len()));
    }

    let series = calculate_ema(closes, span);
    if series.len() < needed {
        return Err(BotError::insufficient(label, needed, series.len()));
    }

    series
        .last()
        .copied()
        .ok_or_else(|| BotError::insufficient(label, needed, 0))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 9).is_empty());
    }

    #[test]
    fn ema_span_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn ema_single_observation_is_that_observation() {
        let ema = calculate_ema(&[42.5], 9);
        assert_eq!(ema, vec![42.5]);
    }

    #[test]
    fn ema_known_values() {
        // span 3 => alpha = 0.5
        let ema = calculate_ema(&[2.0, 4.0, 8.0], 3);
        assert_eq!(ema.len(), 3);
        assert!((ema[0] - 2.0).abs() < 1e-12);
        assert!((ema[1] - 3.0).abs() < 1e-12);
        assert!((ema[2] - 5.5).abs() < 1e-12);
    }

    #[test]
    fn ema_constant_series_stays_constant() {
        let ema = calculate_ema(&[100.0; 30], 21);
        for &v in &ema {
            assert!((v - 100.0).abs() < 1e-10);
        }
    }

    #[test]
    fn ema_truncates_on_nan() {
        let ema = calculate_ema(&[1.0, 2.0, f64::NAN, 4.0], 3);
        assert_eq!(ema.len(), 2);
    }

    #[test]
    fn latest_ema_requires_span_observations() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let err = latest_ema(&closes, 21, "ema_slow").unwrap_err();
        assert_eq!(err, BotError::insufficient("ema_slow", 21, 20));

        assert!(latest_ema(&closes, 9, "ema_fast").is_ok());
    }

    #[test]
    fn latest_ema_empty_is_insufficient() {
        assert!(matches!(
            latest_ema(&[], 9, "ema_fast"),
            Err(BotError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn latest_ema_rejects_series_broken_by_nan() {
        let mut closes = vec![10.0; 12];
        closes[5] = f64::NAN;
        assert!(matches!(
            latest_ema(&closes, 9, "ema_fast"),
            Err(BotError::InsufficientData { available: 5, .. })
        ));
    }

    #[test]
    fn fast_ema_leads_slow_on_rising_series() {
        let closes: Vec<f64> = (100..130).map(|x| x as f64).collect();
        let fast = latest_ema(&closes, 9, "ema_fast").unwrap();
        let slow = latest_ema(&closes, 21, "ema_slow").unwrap();
        assert!(fast > slow, "fast {fast} should exceed slow {slow}");
    }
}

//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA = (price - EMA) * alpha + EMA, alpha = 2 / (period + 1)
//! Seed: SMA of the first `period` prices.
//! Needs period + EMA_WARMUP prices, beyond the mathematical minimum, so the
//! seed's influence has decayed before the value is reported.

/// Extra samples required past `period` before an EMA is reported.
pub const EMA_WARMUP: usize = 20;

/// Latest EMA value, or `None` with fewer than `period + EMA_WARMUP` prices.
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + EMA_WARMUP {
        return None;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = prices[..period].iter().sum::<f64>() / period as f64;

    Some(
        prices[period..]
            .iter()
            .fold(seed, |ema, &price| (price - ema) * alpha + ema),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn ema_constant_series_is_constant() {
        let prices = vec![42.5; 50];
        assert_approx(ema(&prices, 10).unwrap(), 42.5, DEFAULT_EPSILON);
        assert_approx(ema(&prices, 30).unwrap(), 42.5, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_known_values() {
        // period 3, alpha = 0.5. Seed = SMA(10, 11, 12) = 11.
        // Then 20 more prices of 13.0: each step halves the gap to 13.
        // EMA = 13 - 2 * 0.5^20
        let mut prices = vec![10.0, 11.0, 12.0];
        prices.extend(std::iter::repeat(13.0).take(20));
        let expected = 13.0 - 2.0 * 0.5_f64.powi(20);
        assert_approx(ema(&prices, 3).unwrap(), expected, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_requires_warmup_margin() {
        let prices = vec![1.0; 29];
        assert_eq!(ema(&prices, 10), None);
        let prices = vec![1.0; 30];
        assert!(ema(&prices, 10).is_some());
    }

    #[test]
    fn ema_period_zero() {
        assert_eq!(ema(&[1.0; 40], 0), None);
    }
}

//! Simple moving average helpers.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Trailing SMA of width `width`: one value per full window, oldest first
/// (`len - width + 1` values). Empty when the input is shorter than `width`.
pub fn trailing_sma(values: &[f64], width: usize) -> Vec<f64> {
    if width == 0 || values.len() < width {
        return Vec::new();
    }
    values
        .windows(width)
        .map(|w| w.iter().sum::<f64>() / width as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_3_known_values() {
        let out = trailing_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out.len(), 3);
        assert_approx(out[0], 2.0, DEFAULT_EPSILON);
        assert_approx(out[1], 3.0, DEFAULT_EPSILON);
        assert_approx(out[2], 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_short() {
        assert!(trailing_sma(&[1.0, 2.0], 3).is_empty());
        assert!(trailing_sma(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn mean_of_empty() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }
}

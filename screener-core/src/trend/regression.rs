//! Ordinary least-squares line fit over the most recent closes.

/// Result of fitting `y = slope * x + intercept` with `x = 0..length-1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0 by convention when the window is flat.
    pub r_squared: f64,
}

/// Fit a line over the last `length` closes.
///
/// `None` with fewer than `length` closes or a window shorter than two points.
pub fn linear_regression(closes: &[f64], length: usize) -> Option<LinearFit> {
    if length < 2 || closes.len() < length {
        return None;
    }

    let y = &closes[closes.len() - length..];
    let n = length as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &yi) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (yi - y_mean);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, &yi) in y.iter().enumerate() {
        let predicted = slope * i as f64 + intercept;
        ss_res += (yi - predicted).powi(2);
        ss_tot += (yi - y_mean).powi(2);
    }

    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

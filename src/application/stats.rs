//! Descriptive statistics over plain price sequences.
//!
//! None of these functions fail: sparse or degenerate input yields a neutral
//! `0.0` so thin upstream data never turns into an error response.

/// Arithmetic mean; `0.0` for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation around `mean` (Bessel's correction, `n - 1`).
///
/// Returns `0.0` for fewer than two observations.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}

/// Pearson correlation coefficient of two paired sequences.
///
/// Covariance and both variances are accumulated in one pass, each over
/// `n - 1`. Returns `0.0` when the lengths differ, when there are fewer than
/// two pairs, or when either side has zero variance.
///
/// # Examples
///
/// ```
/// use stockstats_gateway::application::stats::correlation;
///
/// let x = [1.0, 2.0, 3.0];
/// assert!((correlation(&x, &x) - 1.0).abs() < 1e-12);
/// assert_eq!(correlation(&x, &[5.0, 5.0, 5.0]), 0.0);
/// ```
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n != y.len() || n < 2 {
        return 0.0;
    }

    let mean_x = average(x);
    let mean_y = average(y);

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (n - 1) as f64;
    let cov = cov / denom;
    let std_x = (var_x / denom).sqrt();
    let std_y = (var_y / denom).sqrt();

    if std_x == 0.0 || std_y == 0.0 {
        return 0.0;
    }
    // Guard against rounding pushing |r| marginally past 1
    (cov / (std_x * std_y)).clamp(-1.0, 1.0)
}

/// Round to `places` decimal places, halves away from zero.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

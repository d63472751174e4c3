//! Descriptive statistics, normalization and correlation.

use super::interpolation::CubicSpline;
use super::EPSILON;

pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Population variance
pub fn variance(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / x.len() as f64
}

pub fn std_dev(x: &[f64]) -> f64 {
    variance(x).sqrt()
}

/// Linear-interpolated quantile, `q` in [0, 1]. Empty input yields 0.
pub fn quantile(x: &[f64], q: f64) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = x.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(x: &[f64]) -> f64 {
    quantile(x, 0.5)
}

/// First and third quartiles
pub fn quartiles(x: &[f64]) -> (f64, f64) {
    (quantile(x, 0.25), quantile(x, 0.75))
}

/// Scale to [0, 1]. A flat signal maps to all zeros.
pub fn min_max_normalize(x: &[f64]) -> Vec<f64> {
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    if !range.is_finite() || range < EPSILON {
        return vec![0.0; x.len()];
    }
    x.iter().map(|v| (v - lo) / range).collect()
}

/// Zero mean, unit variance. A flat signal maps to all zeros.
pub fn z_score(x: &[f64]) -> Vec<f64> {
    let m = mean(x);
    let s = std_dev(x);
    if s < EPSILON {
        return vec![0.0; x.len()];
    }
    x.iter().map(|v| (v - m) / s).collect()
}

/// Cross-correlation over every lag where the sequences overlap.
///
/// Output index `k` holds lag `k - (b.len() - 1)`, so the result has
/// `a.len() + b.len() - 1` entries and lag 0 sits at `b.len() - 1`.
pub fn cross_correlation(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let n = a.len() as isize;
    let m = b.len() as isize;
    (-(m - 1)..n)
        .map(|lag| {
            let mut acc = 0.0;
            for j in 0..m {
                let i = j + lag;
                if i >= 0 && i < n {
                    acc += a[i as usize] * b[j as usize];
                }
            }
            acc
        })
        .collect()
}

/// Mean-centered autocorrelation for lags `0..=max_lag`, normalized so
/// lag 0 equals 1. A flat signal yields all zeros.
pub fn autocorrelation(x: &[f64], max_lag: usize) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let max_lag = max_lag.min(n - 1);
    let m = mean(x);
    let centered: Vec<f64> = x.iter().map(|v| v - m).collect();
    let c0: f64 = centered.iter().map(|v| v * v).sum();
    if c0 < EPSILON {
        return vec![0.0; max_lag + 1];
    }
    (0..=max_lag)
        .map(|lag| {
            centered[..n - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / c0
        })
        .collect()
}

/// Normalized autocorrelation at a single lag using the overlap length as
/// denominator, so a clean periodic signal scores close to 1 regardless of
/// how many periods fit in the window.
pub fn periodicity_at(x: &[f64], lag: usize) -> f64 {
    let n = x.len();
    if lag == 0 || lag >= n {
        return 0.0;
    }
    let m = mean(x);
    let var = variance(x);
    if var < EPSILON {
        return 0.0;
    }
    let overlap = n - lag;
    let cov = (0..overlap).map(|i| (x[i] - m) * (x[i + lag] - m)).sum::<f64>() / overlap as f64;
    (cov / var).clamp(-1.0, 1.0)
}

/// Resample to `target_len` points with a natural cubic spline over the
/// original index axis.
pub fn resample(x: &[f64], target_len: usize) -> Vec<f64> {
    match (x.len(), target_len) {
        (_, 0) => Vec::new(),
        (0, n) => vec![0.0; n],
        (1, n) => vec![x[0]; n],
        (len, 1) => vec![x[len / 2]],
        (len, n) => {
            let xs: Vec<f64> = (0..len).map(|i| i as f64).collect();
            let spline = CubicSpline::new(&xs, x);
            let step = (len - 1) as f64 / (n - 1) as f64;
            (0..n).map(|i| spline.evaluate(i as f64 * step)).collect()
        }
    }
}

/// Third standardized moment; 0 for a flat signal.
pub fn skewness(x: &[f64]) -> f64 {
    let s = std_dev(x);
    if x.is_empty() || s < EPSILON {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|v| ((v - m) / s).powi(3)).sum::<f64>() / x.len() as f64
}

/// Fourth standardized moment (non-excess; a Gaussian scores 3). Flat
/// signals score 0.
pub fn kurtosis(x: &[f64]) -> f64 {
    let s = std_dev(x);
    if x.is_empty() || s < EPSILON {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|v| ((v - m) / s).powi(4)).sum::<f64>() / x.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quartiles_of_sequence() {
        let x: Vec<f64> = (1..=9).map(f64::from).collect();
        let (q1, q3) = quartiles(&x);
        assert_relative_eq!(q1, 3.0);
        assert_relative_eq!(q3, 7.0);
        assert_relative_eq!(median(&x), 5.0);
    }

    #[test]
    fn normalizations() {
        let x = [2.0, 4.0, 6.0];
        assert_eq!(min_max_normalize(&x), vec![0.0, 0.5, 1.0]);
        let z = z_score(&x);
        assert_relative_eq!(mean(&z), 0.0, epsilon = 1e-12);
        assert_relative_eq!(std_dev(&z), 1.0, epsilon = 1e-12);
        assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn cross_correlation_lags() {
        let xc = cross_correlation(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5]);
        assert_eq!(xc.len(), 5);
        // lag 0: 1*0 + 2*1 + 3*0.5
        assert_relative_eq!(xc[2], 3.5);
    }

    #[test]
    fn autocorrelation_of_alternating_signal() {
        let x: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let ac = autocorrelation(&x, 2);
        assert_relative_eq!(ac[0], 1.0);
        assert!(ac[1] < -0.9);
        assert!(ac[2] > 0.85);
        assert!(periodicity_at(&x, 2) > 0.99);
    }

    #[test]
    fn resample_preserves_endpoints() {
        let x = [0.0, 1.0, 4.0, 9.0, 16.0];
        let r = resample(&x, 9);
        assert_eq!(r.len(), 9);
        assert_relative_eq!(r[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(r[8], 16.0, epsilon = 1e-12);
        assert_relative_eq!(r[4], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn moments_of_symmetric_data() {
        let x = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert_relative_eq!(skewness(&x), 0.0, epsilon = 1e-12);
        assert!(kurtosis(&x) > 1.0);
        assert_eq!(skewness(&[1.0, 1.0]), 0.0);
    }
}

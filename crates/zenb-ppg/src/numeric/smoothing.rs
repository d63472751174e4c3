//! Smoothing filters: Savitzky-Golay, moving averages, median, 1-D Kalman.

use ndarray::{Array1, Array2};

use super::linalg::gaussian_elimination;
use super::stats::median;

/// Savitzky-Golay smoothing weights for a centred window of `window`
/// samples (forced odd) and polynomial `order`, from the least-squares
/// normal equations.
pub fn savitzky_golay_coefficients(window: usize, order: usize) -> Vec<f64> {
    let window = if window % 2 == 0 { window + 1 } else { window }.max(1);
    let half = (window / 2) as i64;
    let terms = (order + 1).min(window);

    let mut design = Array2::<f64>::zeros((window, terms));
    for (row, offset) in (-half..=half).enumerate() {
        let mut p = 1.0;
        for col in 0..terms {
            design[[row, col]] = p;
            p *= offset as f64;
        }
    }
    let normal = design.t().dot(&design);
    let mut e0 = Array1::zeros(terms);
    e0[0] = 1.0;
    let c = gaussian_elimination(&normal, &e0);
    design.dot(&c).to_vec()
}

/// Savitzky-Golay smoothing with reflected edges; output keeps the input length.
pub fn savitzky_golay(y: &[f64], window: usize, order: usize) -> Vec<f64> {
    let coef = savitzky_golay_coefficients(window, order);
    convolve_reflect(y, &coef)
}

/// Centred convolution with odd-length `kernel`, reflecting at the edges.
fn convolve_reflect(y: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = y.len();
    if n == 0 || kernel.is_empty() {
        return y.to_vec();
    }
    let half = (kernel.len() / 2) as isize;
    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * y[reflect(i + k as isize - half, n)])
                .sum()
        })
        .collect()
}

fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let mut j = i.rem_euclid(period);
    if j >= n {
        j = period - j;
    }
    j as usize
}

/// Centred box average; the window shrinks at the edges.
pub fn simple_moving_average(y: &[f64], window: usize) -> Vec<f64> {
    let n = y.len();
    let half = window.max(1) / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            y[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// Centred triangular-weighted average (weights 1, 2, .., k, .., 2, 1).
pub fn triangular_moving_average(y: &[f64], window: usize) -> Vec<f64> {
    let n = y.len();
    let half = (window.max(1) / 2) as isize;
    (0..n as isize)
        .map(|i| {
            let (mut acc, mut norm) = (0.0, 0.0);
            for k in -half..=half {
                let j = i + k;
                if j < 0 || j >= n as isize {
                    continue;
                }
                let w = (half + 1 - k.abs()) as f64;
                acc += w * y[j as usize];
                norm += w;
            }
            if norm > 0.0 {
                acc / norm
            } else {
                y[i as usize]
            }
        })
        .collect()
}

/// Exponential moving average with `alpha = 2 / (window + 1)`.
pub fn exponential_moving_average(y: &[f64], window: usize) -> Vec<f64> {
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = Vec::with_capacity(y.len());
    let mut prev = match y.first() {
        Some(&v) => v,
        None => return out,
    };
    for &v in y {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Centred running median; the window shrinks at the edges.
pub fn median_filter(y: &[f64], window: usize) -> Vec<f64> {
    let n = y.len();
    let half = window.max(1) / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            median(&y[lo..hi])
        })
        .collect()
}

/// Scalar Kalman filter with a random-walk state model.
#[derive(Debug, Clone)]
pub struct KalmanFilter1d {
    process_noise: f64,
    measurement_noise: f64,
    estimate: f64,
    error: f64,
    initialized: bool,
}

impl KalmanFilter1d {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: 0.0,
            error: 1.0,
            initialized: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.process_noise, self.measurement_noise);
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Predict, then correct with `measurement`; returns the new estimate.
    pub fn update(&mut self, measurement: f64) -> f64 {
        if !measurement.is_finite() {
            self.error += self.process_noise;
            return self.estimate;
        }
        if !self.initialized {
            self.estimate = measurement;
            self.initialized = true;
            return self.estimate;
        }
        let predicted_error = self.error + self.process_noise;
        let gain = predicted_error / (predicted_error + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error = (1.0 - gain) * predicted_error;
        self.estimate
    }

    /// Run a fresh filter over a whole sequence.
    pub fn filter(y: &[f64], process_noise: f64, measurement_noise: f64) -> Vec<f64> {
        let mut kf = Self::new(process_noise, measurement_noise);
        y.iter().map(|&v| kf.update(v)).collect()
    }
}

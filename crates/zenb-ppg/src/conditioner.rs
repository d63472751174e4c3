//! Signal Conditioner
//!
//! Fixed four-stage chain applied to a raw channel series:
//!
//! 1. IQR outlier clipping (outliers replaced by the median)
//! 2. Smoothing (box average or Savitzky-Golay)
//! 3. Single-pole high-pass then low-pass band isolation
//! 4. Windowed median denoising
//!
//! Every stage is total and length-preserving.

use ndarray::Array1;
use std::f64::consts::PI;

use crate::config::{ConditionerConfig, SmoothingKind};
use crate::numeric::{smoothing, stats};
use crate::sampler::{Channel, Sample};

pub struct SignalConditioner {
    config: ConditionerConfig,
}

impl Default for SignalConditioner {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalConditioner {
    pub fn new() -> Self {
        Self::with_config(ConditionerConfig::default())
    }

    pub fn with_config(config: ConditionerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConditionerConfig {
        &self.config
    }

    /// Run the full chain. Output has the same length as `signal`.
    pub fn condition(&self, signal: &Array1<f64>) -> Array1<f64> {
        if signal.len() < 2 {
            return signal.clone();
        }
        let raw = signal.to_vec();
        let clipped = clip_outliers(&raw, self.config.iqr_factor);
        let smoothed = self.smooth(&clipped);
        let banded = bandpass(
            &smoothed,
            self.config.sample_rate,
            self.config.low_cut_hz,
            self.config.high_cut_hz,
        );
        let denoised = smoothing::median_filter(&banded, self.config.median_window);
        Array1::from(denoised)
    }

    /// Extract one channel from a sample window and condition it.
    pub fn condition_samples(&self, samples: &[Sample], channel: Channel) -> Array1<f64> {
        let raw: Array1<f64> = samples.iter().map(|s| s.channel(channel)).collect();
        self.condition(&raw)
    }

    fn smooth(&self, y: &[f64]) -> Vec<f64> {
        let window = self.config.smoothing_window;
        match self.config.smoothing {
            SmoothingKind::MovingAverage => smoothing::simple_moving_average(y, window),
            SmoothingKind::SavitzkyGolay { order } => smoothing::savitzky_golay(y, window, order),
        }
    }
}

/// Replace values outside `[Q1 - k*IQR, Q3 + k*IQR]` with the median.
pub fn clip_outliers(y: &[f64], k: f64) -> Vec<f64> {
    if y.is_empty() {
        return Vec::new();
    }
    let (q1, q3) = stats::quartiles(y);
    let iqr = q3 - q1;
    let lo = q1 - k * iqr;
    let hi = q3 + k * iqr;
    let med = stats::median(y);
    y.iter()
        .map(|&v| if v.is_finite() && v >= lo && v <= hi { v } else { med })
        .collect()
}

/// First-order IIR band-pass: high-pass at `low_hz`, then low-pass at
/// `high_hz`. The first output sample is zero.
pub fn bandpass(y: &[f64], sample_rate: f64, low_hz: f64, high_hz: f64) -> Vec<f64> {
    let n = y.len();
    if n < 2 || sample_rate <= 0.0 {
        return y.to_vec();
    }
    let dt = 1.0 / sample_rate;

    let hp_rc = 1.0 / (2.0 * PI * low_hz.max(0.01));
    let hp_alpha = hp_rc / (hp_rc + dt);
    let lp_rc = 1.0 / (2.0 * PI * high_hz.max(0.1));
    let lp_alpha = dt / (lp_rc + dt);

    let mut out = vec![0.0; n];
    let mut prev_in = y[0];
    let mut prev_out = 0.0;
    for i in 1..n {
        let hp = hp_alpha * (prev_out + y[i] - prev_in);
        prev_in = y[i];
        prev_out = hp;
        out[i] = hp;
    }

    let mut prev = out[0];
    for v in out.iter_mut().skip(1) {
        prev = lp_alpha * *v + (1.0 - lp_alpha) * prev;
        *v = prev;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(freq: f64, fs: f64, n: usize, offset: f64) -> Vec<f64> {
        (0..n)
            .map(|i| offset + (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn clip_replaces_spike_with_median() {
        let mut y = vec![1.0, 2.0, 1.5, 2.0, 1.0, 1.5, 2.0, 1.0];
        y[3] = 100.0;
        let out = clip_outliers(&y, 1.5);
        assert_abs_diff_eq!(out[3], stats::median(&y), epsilon = 1e-12);
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn bandpass_removes_dc() {
        let y = sine(1.2, 30.0, 300, 150.0);
        let out = bandpass(&y, 30.0, 0.5, 4.5);
        let tail = &out[150..];
        assert!(stats::mean(tail).abs() < 0.1);
        assert!(stats::std_dev(tail) > 0.3);
    }

    #[test]
    fn bandpass_attenuates_fast_noise() {
        let slow = bandpass(&sine(1.0, 30.0, 300, 0.0), 30.0, 0.5, 4.5);
        let fast = bandpass(&sine(12.0, 30.0, 300, 0.0), 30.0, 0.5, 4.5);
        assert!(stats::std_dev(&fast[150..]) < stats::std_dev(&slow[150..]));
    }

    #[test]
    fn condition_preserves_length() {
        let conditioner = SignalConditioner::new();
        for n in [0usize, 1, 2, 7, 90, 450] {
            let signal = Array1::from(sine(1.2, 30.0, n, 120.0));
            assert_eq!(conditioner.condition(&signal).len(), n);
        }
    }

    #[test]
    fn flat_signal_stays_finite() {
        let conditioner = SignalConditioner::with_config(ConditionerConfig {
            smoothing: SmoothingKind::SavitzkyGolay { order: 2 },
            smoothing_window: 7,
            ..ConditionerConfig::default()
        });
        let out = conditioner.condition(&Array1::from_elem(120, 42.0));
        assert!(out.iter().all(|v| v.is_finite() && v.abs() < 1e-9));
    }
}

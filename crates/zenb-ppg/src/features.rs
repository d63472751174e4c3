//! Feature Extractor
//!
//! Reduces a conditioned window to a fixed-shape [`FeatureVector`].
//! Anything that cannot be computed takes a neutral value instead of NaN:
//!
//! | feature              | neutral |
//! |----------------------|---------|
//! | moments, spectral    | 0       |
//! | `peak_valley_ratio`  | 1       |
//! | `pulse_transit_time` | 0 (fewer than one valley/peak pair) |
//! | `harmonic_ratio`     | 0 (fewer than two intervals) |
//! | `spo2_ratio`         | 0 (no usable red/blue AC or DC) |

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use crate::numeric::{spectral, stats, EPSILON};
use crate::sampler::{Channel, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureVector {
    /// max - min
    pub amplitude: f64,
    pub mean: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    /// Hz
    pub spectral_centroid: f64,
    /// Normalized to [0, 1]
    pub spectral_entropy: f64,
    /// Hz, strongest bin inside the pulse band
    pub dominant_frequency: f64,
    /// Fraction of consecutive pairs crossing the mean
    pub zero_crossing_rate: f64,
    pub peak_valley_ratio: f64,
    /// Mean valley-to-next-peak rise time (seconds)
    pub pulse_transit_time: f64,
    /// `1 / (1 + cv)` of inter-peak intervals
    pub harmonic_ratio: f64,
    /// RMS of the first difference relative to amplitude
    pub noise_level: f64,
    /// Red/blue AC-DC ratio of ratios
    pub spo2_ratio: f64,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            amplitude: 0.0,
            mean: 0.0,
            variance: 0.0,
            skewness: 0.0,
            kurtosis: 0.0,
            spectral_centroid: 0.0,
            spectral_entropy: 0.0,
            dominant_frequency: 0.0,
            zero_crossing_rate: 0.0,
            peak_valley_ratio: 1.0,
            pulse_transit_time: 0.0,
            harmonic_ratio: 0.0,
            noise_level: 0.0,
            spo2_ratio: 0.0,
        }
    }
}

/// Features plus the peak/valley indices they were derived from.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub features: FeatureVector,
    pub peaks: Vec<usize>,
    pub valleys: Vec<usize>,
}

pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::with_config(FeatureConfig::default())
    }

    pub fn with_config(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract from a conditioned signal. `samples` is the raw window the
    /// signal came from, used for the SpO2 ratio; pass `&[]` if unknown.
    pub fn extract(&self, signal: &Array1<f64>, samples: &[Sample]) -> Extraction {
        let y = signal.to_vec();
        let fs = self.config.sample_rate;
        let peaks = self.detect_peaks(&y);
        let valleys = self.detect_valleys(&y);

        let mut f = FeatureVector::default();
        if y.len() < 2 {
            return Extraction { features: f, peaks, valleys };
        }

        let (lo, hi) = min_max(&y);
        f.amplitude = hi - lo;
        f.mean = stats::mean(&y);
        f.variance = stats::variance(&y);
        f.skewness = stats::skewness(&y);
        f.kurtosis = stats::kurtosis(&y);

        let window = &y[..y.len().min(self.config.max_fft_size)];
        let psd = spectral::power_spectral_density(window, fs);
        let band = self.config.pulse_band;
        f.spectral_centroid = spectral::spectral_centroid(&psd, band.min, band.max);
        f.spectral_entropy = spectral::spectral_entropy(&psd, band.min, band.max);
        f.dominant_frequency = spectral::dominant_in(&psd, band.min, band.max);

        f.zero_crossing_rate = zero_crossing_rate(&y);
        f.peak_valley_ratio = peak_valley_ratio(&y, &peaks, &valleys, f.mean);
        f.pulse_transit_time = rise_time(&peaks, &valleys, fs);
        f.harmonic_ratio = harmonic_ratio(&peaks);
        f.noise_level = if f.amplitude > EPSILON {
            let diffs: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
            (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt() / f.amplitude
        } else {
            0.0
        };
        f.spo2_ratio = ratio_of_ratios(samples);

        Extraction {
            features: sanitize(f),
            peaks,
            valleys,
        }
    }

    /// Indices of samples that strictly exceed their `peak_neighbors` left
    /// neighbours, are not exceeded by the right ones and clear
    /// `mean + k * std`. On a plateau the first sample wins. Peaks closer
    /// than the minimum spacing keep the taller one.
    pub fn detect_peaks(&self, y: &[f64]) -> Vec<usize> {
        let threshold = stats::mean(y) + self.config.peak_threshold_k * stats::std_dev(y);
        self.local_extrema(y, |a, b| a > b, |v| v > threshold)
    }

    /// Mirror of [`detect_peaks`](Self::detect_peaks) below `mean - k * std`.
    pub fn detect_valleys(&self, y: &[f64]) -> Vec<usize> {
        let threshold = stats::mean(y) - self.config.peak_threshold_k * stats::std_dev(y);
        self.local_extrema(y, |a, b| a < b, |v| v < threshold)
    }

    /// Shared scan for peaks and valleys. A candidate must strictly dominate
    /// its left neighbours while the right neighbours only need not to
    /// dominate it, so a flat top of equal samples yields exactly one
    /// extremum at its first sample instead of none.
    fn local_extrema<D, T>(&self, y: &[f64], dominates: D, passes: T) -> Vec<usize>
    where
        D: Fn(f64, f64) -> bool,
        T: Fn(f64) -> bool,
    {
        let k = self.config.peak_neighbors.max(1);
        let n = y.len();
        if n < 2 * k + 1 || stats::std_dev(y) < EPSILON {
            return Vec::new();
        }
        let min_gap = (self.config.min_peak_spacing_secs * self.config.sample_rate)
            .round()
            .max(1.0) as usize;

        let mut found: Vec<usize> = Vec::new();
        for i in k..n - k {
            let v = y[i];
            if !passes(v) {
                continue;
            }
            let left = (i - k..i).all(|j| dominates(v, y[j]));
            let right = (i + 1..=i + k).all(|j| !dominates(y[j], v));
            if !(left && right) {
                continue;
            }
            match found.last_mut() {
                Some(last) if i - *last < min_gap => {
                    if dominates(v, y[*last]) {
                        *last = i;
                    }
                }
                _ => found.push(i),
            }
        }
        found
    }
}

/// Red/blue `(AC/DC)` ratio of ratios over the raw window.
pub fn ratio_of_ratios(samples: &[Sample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let red: Vec<f64> = samples.iter().map(|s| s.channel(Channel::Red)).collect();
    let blue: Vec<f64> = samples.iter().map(|s| s.channel(Channel::Blue)).collect();
    let (dc_red, dc_blue) = (stats::mean(&red), stats::mean(&blue));
    if dc_red < 1.0 || dc_blue < 1.0 {
        return 0.0;
    }
    let (ac_red, ac_blue) = (stats::std_dev(&red), stats::std_dev(&blue));
    if ac_red < 1e-3 || ac_blue < 1e-3 {
        return 0.0;
    }
    (ac_red / dc_red) / (ac_blue / dc_blue)
}

/// Mean inter-peak interval in samples; `None` with fewer than two peaks.
pub fn mean_interval(peaks: &[usize]) -> Option<f64> {
    let intervals = intervals(peaks);
    if intervals.is_empty() {
        None
    } else {
        Some(stats::mean(&intervals))
    }
}

pub(crate) fn intervals(peaks: &[usize]) -> Vec<f64> {
    peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect()
}

fn min_max(y: &[f64]) -> (f64, f64) {
    y.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn zero_crossing_rate(y: &[f64]) -> f64 {
    let m = stats::mean(y);
    let crossings = y
        .windows(2)
        .filter(|w| (w[0] - m) * (w[1] - m) < 0.0)
        .count();
    crossings as f64 / (y.len() - 1) as f64
}

fn peak_valley_ratio(y: &[f64], peaks: &[usize], valleys: &[usize], mean: f64) -> f64 {
    if peaks.is_empty() || valleys.is_empty() {
        return 1.0;
    }
    let height = peaks.iter().map(|&i| y[i] - mean).sum::<f64>() / peaks.len() as f64;
    let depth = valleys.iter().map(|&i| mean - y[i]).sum::<f64>() / valleys.len() as f64;
    if depth < EPSILON {
        1.0
    } else {
        height / depth
    }
}

fn rise_time(peaks: &[usize], valleys: &[usize], sample_rate: f64) -> f64 {
    let mut rises = Vec::new();
    for &v in valleys {
        if let Some(&p) = peaks.iter().find(|&&p| p > v) {
            rises.push((p - v) as f64);
        }
    }
    if rises.is_empty() || sample_rate <= 0.0 {
        0.0
    } else {
        stats::mean(&rises) / sample_rate
    }
}

fn harmonic_ratio(peaks: &[usize]) -> f64 {
    let intervals = intervals(peaks);
    if intervals.len() < 2 {
        return 0.0;
    }
    let m = stats::mean(&intervals);
    if m < EPSILON {
        return 0.0;
    }
    1.0 / (1.0 + stats::std_dev(&intervals) / m)
}

fn sanitize(mut f: FeatureVector) -> FeatureVector {
    let neutral = FeatureVector::default();
    let fix = |v: f64, d: f64| if v.is_finite() { v } else { d };
    f.amplitude = fix(f.amplitude, neutral.amplitude);
    f.mean = fix(f.mean, neutral.mean);
    f.variance = fix(f.variance, neutral.variance);
    f.skewness = fix(f.skewness, neutral.skewness);
    f.kurtosis = fix(f.kurtosis, neutral.kurtosis);
    f.spectral_centroid = fix(f.spectral_centroid, neutral.spectral_centroid);
    f.spectral_entropy = fix(f.spectral_entropy, neutral.spectral_entropy);
    f.dominant_frequency = fix(f.dominant_frequency, neutral.dominant_frequency);
    f.zero_crossing_rate = fix(f.zero_crossing_rate, neutral.zero_crossing_rate);
    f.peak_valley_ratio = fix(f.peak_valley_ratio, neutral.peak_valley_ratio);
    f.pulse_transit_time = fix(f.pulse_transit_time, neutral.pulse_transit_time);
    f.harmonic_ratio = fix(f.harmonic_ratio, neutral.harmonic_ratio);
    f.noise_level = fix(f.noise_level, neutral.noise_level);
    f.spo2_ratio = fix(f.spo2_ratio, neutral.spo2_ratio);
    f
}

//! Vitals Estimator
//!
//! Stateless mapping from one window's features to a [`VitalsEstimate`]:
//!
//! 1. Heart rate from IQR-validated inter-peak intervals, gated on the
//!    window's periodicity at the beat lag.
//! 2. Similarity of the feature vector to every reference pattern
//!    (exponential decay per dimension, demographic and accuracy bonus).
//! 3. Accuracy-weighted blend of the top-K patterns, each scaled by a
//!    bounded amplitude/frequency/SpO2 ratio correction.
//! 4. Optional seeded jitter, physiological clamps and the BP gap.
//! 5. Optional calibration pull toward user reference values.
//!
//! The only state across calls is the caller's sample buffer; the
//! session's state machine is tracked by [`EstimatorState`].

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{Bounds, EstimatorConfig, VitalRanges};
use crate::features::{self, Extraction, FeatureVector};
use crate::numeric::{stats, EPSILON};
use crate::reference::{ReferenceDataset, ReferencePattern};
use crate::vitals::{CalibrationOffset, Demographics, EstimateStatus, VitalsEstimate};

/// Lifecycle of the estimator inside a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimatorState {
    Idle,
    /// Fewer than `min_samples` buffered
    Accumulating,
    Ready,
    Estimating,
    Emitted,
}

impl EstimatorState {
    /// State after a sample arrives with `len` samples buffered.
    pub fn on_sample(self, len: usize, min_samples: usize) -> Self {
        match self {
            EstimatorState::Idle => EstimatorState::Idle,
            EstimatorState::Accumulating if len >= min_samples => EstimatorState::Ready,
            other => other,
        }
    }

    pub fn can_estimate(self) -> bool {
        matches!(self, EstimatorState::Ready | EstimatorState::Emitted)
    }
}

/// How the heart rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateDetail {
    pub bpm: f64,
    /// True when the population default was used
    pub fallback: bool,
    /// Mean validated interval in samples
    pub mean_interval: Option<f64>,
    pub valid_intervals: usize,
    /// Normalized autocorrelation at the beat lag
    pub periodicity: f64,
    /// Peaks came at twice the beat rate and were paired up
    #[serde(default)]
    pub double_counted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPattern {
    pub id: String,
    /// Raw similarity score
    pub similarity: f64,
    /// Normalized ensemble weight
    pub weight: f64,
}

/// Estimator output before quality scoring.
#[derive(Debug, Clone)]
pub struct Estimation {
    pub estimate: VitalsEstimate,
    pub heart_rate: HeartRateDetail,
    pub matches: Vec<MatchedPattern>,
    /// Best similarity scaled to [0, 1]
    pub agreement: f64,
}

/// Per-dimension (weight, decay scale) for the similarity kernel, in the
/// order of [`similarity_dimensions`].
const SIMILARITY_KERNEL: [(f64, f64); 6] = [
    (0.25, 2.0),  // amplitude
    (0.25, 0.3),  // dominant frequency
    (0.15, 0.4),  // spectral centroid
    (0.10, 0.2),  // spectral entropy
    (0.15, 0.2),  // harmonic ratio
    (0.10, 0.03), // zero-crossing rate
];

fn similarity_dimensions(f: &FeatureVector) -> [f64; 6] {
    [
        f.amplitude,
        f.dominant_frequency,
        f.spectral_centroid,
        f.spectral_entropy,
        f.harmonic_ratio,
        f.zero_crossing_rate,
    ]
}

pub struct VitalsEstimator {
    config: EstimatorConfig,
    dataset: ReferenceDataset,
}

impl Default for VitalsEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl VitalsEstimator {
    pub fn new() -> Self {
        Self::with_config(EstimatorConfig::default(), ReferenceDataset::builtin())
    }

    pub fn with_config(config: EstimatorConfig, dataset: ReferenceDataset) -> Self {
        Self { config, dataset }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn dataset(&self) -> &ReferenceDataset {
        &self.dataset
    }

    /// Estimate every vital from a conditioned window and its extraction.
    /// `confidence` and `accuracy` are left at zero for the quality scorer.
    pub fn estimate(
        &self,
        signal: &Array1<f64>,
        extraction: &Extraction,
        demographics: Option<&Demographics>,
        calibration: Option<&CalibrationOffset>,
    ) -> Estimation {
        let heart_rate = self.heart_rate(signal, &extraction.peaks);
        let features = &extraction.features;

        let scored = self.rank_patterns(features, demographics);
        let agreement = scored
            .first()
            .map(|(_, s)| (s / self.max_similarity()).clamp(0.0, 1.0))
            .unwrap_or(0.0);
        let (blend, matches) = self.blend(features, &scored);

        let ranges = &self.config.ranges;
        let mut estimate = VitalsEstimate {
            heart_rate: heart_rate.bpm,
            spo2: blend.spo2,
            systolic: blend.systolic,
            diastolic: blend.diastolic,
            glucose: blend.glucose,
            viscosity: blend.viscosity,
            confidence: 0.0,
            accuracy: 0.0,
            status: EstimateStatus::Valid,
        };

        if let Some(jitter) = &self.config.jitter {
            let mut rng = StdRng::seed_from_u64(jitter.seed);
            let a = jitter.amplitude.abs();
            estimate.glucose *= 1.0 + rng.gen_range(-a..=a);
            estimate.viscosity *= 1.0 + rng.gen_range(-a..=a);
        }

        clamp_estimate(&mut estimate, ranges, self.config.min_bp_gap);

        if let Some(cal) = calibration {
            apply_calibration(&mut estimate, cal, self.config.calibration_pull);
            clamp_estimate(&mut estimate, ranges, self.config.min_bp_gap);
        }

        Estimation {
            estimate,
            heart_rate,
            matches,
            agreement,
        }
    }

    /// Heart rate from validated inter-peak intervals. Falls back to the
    /// configured default when fewer than `min_intervals` intervals survive,
    /// or when the window is periodic neither at the mean interval nor at
    /// twice it. The second lag catches a notch or split top counted as an
    /// extra beat.
    pub fn heart_rate(&self, signal: &Array1<f64>, peaks: &[usize]) -> HeartRateDetail {
        let fallback = |mean_interval: Option<f64>, valid_intervals: usize, periodicity: f64| {
            log::debug!(
                "heart rate fallback to {} bpm (intervals={}, periodicity={:.2})",
                self.config.default_heart_rate,
                valid_intervals,
                periodicity
            );
            HeartRateDetail {
                bpm: self.config.ranges.heart_rate.clamp(self.config.default_heart_rate),
                fallback: true,
                mean_interval,
                valid_intervals,
                periodicity,
                double_counted: false,
            }
        };

        let raw = features::intervals(peaks);
        if raw.is_empty() {
            return fallback(None, 0, 0.0);
        }
        let (q1, q3) = stats::quartiles(&raw);
        let iqr = q3 - q1;
        let k = self.config.interval_iqr_factor;
        let valid: Vec<f64> = raw
            .iter()
            .copied()
            .filter(|&d| d >= q1 - k * iqr && d <= q3 + k * iqr)
            .collect();
        if valid.is_empty() {
            return fallback(None, 0, 0.0);
        }
        let mean_interval = stats::mean(&valid);
        if valid.len() < self.config.min_intervals || mean_interval < EPSILON {
            return fallback(Some(mean_interval), valid.len(), 0.0);
        }

        let y = signal.to_vec();
        let lag = mean_interval.round() as usize;
        let mut beat = mean_interval;
        let mut periodicity = stats::periodicity_at(&y, lag);
        let mut double_counted = false;
        if periodicity < self.config.min_periodicity {
            // an extra peak per beat leaves the half-beat lag anti-correlated
            let paired = if periodicity < 0.0 {
                stats::periodicity_at(&y, 2 * lag)
            } else {
                f64::NEG_INFINITY
            };
            if paired < self.config.min_periodicity {
                return fallback(Some(mean_interval), valid.len(), periodicity.max(paired));
            }
            beat = 2.0 * mean_interval;
            periodicity = paired;
            double_counted = true;
        }

        let bpm = 60.0 * self.config.sample_rate / beat;
        HeartRateDetail {
            bpm: self.config.ranges.heart_rate.clamp(bpm),
            fallback: false,
            mean_interval: Some(beat),
            valid_intervals: valid.len(),
            periodicity,
            double_counted,
        }
    }

    /// Similarity of `features` to one pattern.
    pub fn similarity(
        &self,
        features: &FeatureVector,
        pattern: &ReferencePattern,
        demographics: Option<&Demographics>,
    ) -> f64 {
        let current = similarity_dimensions(features);
        let prototype = similarity_dimensions(&pattern.features);
        let total_weight: f64 = SIMILARITY_KERNEL.iter().map(|(w, _)| w).sum();
        let feature_score = SIMILARITY_KERNEL
            .iter()
            .zip(current.iter().zip(&prototype))
            .map(|((weight, scale), (c, p))| weight * (-(c - p).abs() / scale).exp())
            .sum::<f64>()
            / total_weight;

        let s = &self.config.similarity;
        let demographic = demographics
            .map(|d| {
                let age = s.age_weight * (-(d.age - pattern.age).abs() / s.age_scale.max(EPSILON)).exp();
                let gender = if d.gender == pattern.gender { s.gender_bonus } else { 0.0 };
                age + gender
            })
            .unwrap_or(0.0);

        feature_score + demographic + s.accuracy_bonus * pattern.accuracy
    }

    fn max_similarity(&self) -> f64 {
        let s = &self.config.similarity;
        1.0 + s.age_weight + s.gender_bonus + s.accuracy_bonus
    }

    /// Patterns sorted by descending similarity, truncated to top-K.
    /// Ties keep catalog order.
    fn rank_patterns(
        &self,
        features: &FeatureVector,
        demographics: Option<&Demographics>,
    ) -> Vec<(&ReferencePattern, f64)> {
        let mut scored: Vec<(&ReferencePattern, f64)> = self
            .dataset
            .patterns
            .iter()
            .map(|p| (p, self.similarity(features, p, demographics)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.config.top_k.max(1));
        scored
    }

    fn blend(
        &self,
        features: &FeatureVector,
        scored: &[(&ReferencePattern, f64)],
    ) -> (Blend, Vec<MatchedPattern>) {
        if scored.is_empty() {
            return (Blend::population(), Vec::new());
        }
        let p = self.config.accuracy_exponent;
        let raw: Vec<f64> = scored.iter().map(|(pat, _)| pat.accuracy.max(0.0).powf(p)).collect();
        let total: f64 = raw.iter().sum();
        let weights: Vec<f64> = if total > EPSILON {
            raw.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / scored.len() as f64; scored.len()]
        };

        let mut blend = Blend::zero();
        let mut matches = Vec::with_capacity(scored.len());
        for ((pattern, similarity), &w) in scored.iter().zip(&weights) {
            let c = self.corrections(features, &pattern.features);
            let v = &pattern.vitals;
            blend.spo2 += w * v.spo2 * c.spo2;
            blend.systolic += w * v.systolic * c.systolic;
            blend.diastolic += w * v.diastolic * c.diastolic;
            blend.glucose += w * v.glucose * c.glucose;
            blend.viscosity += w * v.viscosity * c.viscosity;
            matches.push(MatchedPattern {
                id: pattern.id.clone(),
                similarity: *similarity,
                weight: w,
            });
        }
        (blend, matches)
    }

    /// Per-field multiplicative corrections from the current/prototype
    /// ratios. Each base ratio and each final factor is held inside
    /// `ratio_bounds`; unavailable features give a ratio of 1.
    fn corrections(&self, current: &FeatureVector, prototype: &FeatureVector) -> Corrections {
        let bounds = self.config.ratio_bounds;
        let amp = bounded_ratio(current.amplitude, prototype.amplitude, bounds);
        let freq = bounded_ratio(current.dominant_frequency, prototype.dominant_frequency, bounds);
        // higher ratio of ratios means lower saturation
        let oxy = bounded_ratio(prototype.spo2_ratio, current.spo2_ratio, bounds);

        Corrections {
            spo2: bounds.clamp(oxy.powf(0.05)),
            systolic: bounds.clamp(freq.powf(0.15) * amp.powf(-0.05)),
            diastolic: bounds.clamp(freq.powf(0.10)),
            glucose: bounds.clamp(freq.powf(0.05) * amp.powf(-0.10)),
            viscosity: bounds.clamp(amp.powf(-0.15)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Blend {
    spo2: f64,
    systolic: f64,
    diastolic: f64,
    glucose: f64,
    viscosity: f64,
}

impl Blend {
    fn zero() -> Self {
        Self {
            spo2: 0.0,
            systolic: 0.0,
            diastolic: 0.0,
            glucose: 0.0,
            viscosity: 0.0,
        }
    }

    fn population() -> Self {
        Self {
            spo2: VitalsEstimate::DEFAULT_SPO2,
            systolic: VitalsEstimate::DEFAULT_SYSTOLIC,
            diastolic: VitalsEstimate::DEFAULT_DIASTOLIC,
            glucose: VitalsEstimate::DEFAULT_GLUCOSE,
            viscosity: VitalsEstimate::DEFAULT_VISCOSITY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Corrections {
    spo2: f64,
    systolic: f64,
    diastolic: f64,
    glucose: f64,
    viscosity: f64,
}

fn bounded_ratio(num: f64, den: f64, bounds: Bounds) -> f64 {
    if num <= EPSILON || den <= EPSILON || !num.is_finite() || !den.is_finite() {
        return 1.0;
    }
    bounds.clamp(num / den)
}

/// Clamp every field to its range and keep diastolic at least `gap` below
/// systolic.
pub fn clamp_estimate(estimate: &mut VitalsEstimate, ranges: &VitalRanges, gap: f64) {
    estimate.heart_rate = ranges.heart_rate.clamp(estimate.heart_rate);
    estimate.spo2 = ranges.spo2.clamp(estimate.spo2);
    estimate.glucose = ranges.glucose.clamp(estimate.glucose);
    estimate.viscosity = ranges.viscosity.clamp(estimate.viscosity);

    let mut sys = ranges.systolic.clamp(estimate.systolic);
    let mut dia = ranges.diastolic.clamp(estimate.diastolic);
    if dia > sys - gap {
        dia = sys - gap;
    }
    if dia < ranges.diastolic.min {
        dia = ranges.diastolic.min;
        sys = ranges.systolic.clamp(sys.max(dia + gap));
    }
    estimate.systolic = sys;
    estimate.diastolic = dia;
}

/// Linear pull toward the user's references: `(1 - pull) * model + pull * reference`.
pub fn apply_calibration(estimate: &mut VitalsEstimate, cal: &CalibrationOffset, pull: f64) {
    let mix = |model: f64, reference: f64| (1.0 - pull) * model + pull * reference;
    if let Some(g) = cal.glucose {
        estimate.glucose = mix(estimate.glucose, g);
    }
    if let Some(v) = cal.viscosity {
        estimate.viscosity = mix(estimate.viscosity, v);
    }
    if let Some((sys, dia)) = cal.blood_pressure {
        estimate.systolic = mix(estimate.systolic, sys);
        estimate.diastolic = mix(estimate.diastolic, dia);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JitterConfig;
    use crate::features::FeatureExtractor;
    use crate::vitals::Gender;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn sine(freq: f64, n: usize) -> Array1<f64> {
        (0..n).map(|i| 3.0 * (2.0 * PI * freq * i as f64 / 30.0).sin()).collect()
    }

    fn run(estimator: &VitalsEstimator, signal: &Array1<f64>) -> Estimation {
        let extraction = FeatureExtractor::new().extract(signal, &[]);
        estimator.estimate(signal, &extraction, None, None)
    }

    #[test]
    fn heart_rate_of_sine() {
        let estimator = VitalsEstimator::new();
        for freq in [1.0, 1.2, 1.5, 2.0] {
            let est = run(&estimator, &sine(freq, 300));
            assert!(!est.heart_rate.fallback);
            assert_abs_diff_eq!(est.estimate.heart_rate, 60.0 * freq, epsilon = 3.0);
        }
    }

    #[test]
    fn too_few_peaks_falls_back() {
        let estimator = VitalsEstimator::new();
        let hr = estimator.heart_rate(&Array1::zeros(90), &[40]);
        assert!(hr.fallback);
        assert_eq!(hr.bpm, 72.0);
    }

    #[test]
    fn single_interval_is_not_trusted() {
        let estimator = VitalsEstimator::new();
        // two peaks one period apart on a clean sine still fall back
        let hr = estimator.heart_rate(&sine(1.0, 90), &[7, 37]);
        assert!(hr.fallback);
        assert_eq!(hr.valid_intervals, 1);
        assert_eq!(hr.bpm, 72.0);
    }

    #[test]
    fn extra_peak_per_beat_is_paired_up() {
        let estimator = VitalsEstimator::new();
        let signal = sine(1.0, 300);
        // true peaks every 30 samples plus one spurious peak midway
        let peaks: Vec<usize> = (0..19).map(|k| 7 + 15 * k).collect();
        let hr = estimator.heart_rate(&signal, &peaks);
        assert!(!hr.fallback);
        assert!(hr.double_counted);
        assert_abs_diff_eq!(hr.bpm, 60.0, epsilon = 0.5);
        assert!(hr.periodicity > 0.9);
    }

    #[test]
    fn interval_outliers_are_discarded() {
        let estimator = VitalsEstimator::new();
        let signal = sine(1.0, 300);
        // one missed beat (60 samples) among 30-sample intervals
        let peaks = [7, 37, 67, 97, 157, 187, 217, 247];
        let hr = estimator.heart_rate(&signal, &peaks);
        assert_eq!(hr.valid_intervals, 6);
        assert_abs_diff_eq!(hr.bpm, 60.0, epsilon = 0.5);
    }

    #[test]
    fn outputs_are_clamped_with_bp_gap() {
        let ranges = VitalRanges::default();
        let mut est = VitalsEstimate {
            heart_rate: 400.0,
            spo2: 120.0,
            systolic: 90.0,
            diastolic: 118.0,
            glucose: f64::NAN,
            viscosity: 0.1,
            confidence: 0.0,
            accuracy: 0.0,
            status: EstimateStatus::Valid,
        };
        clamp_estimate(&mut est, &ranges, 20.0);
        assert_eq!(est.heart_rate, 200.0);
        assert_eq!(est.spo2, 100.0);
        assert_eq!(est.glucose, 70.0);
        assert_eq!(est.viscosity, 1.2);
        assert!(est.systolic - est.diastolic >= 20.0);
        assert!(ranges.diastolic.contains(est.diastolic));
    }

    #[test]
    fn calibration_pulls_twenty_percent() {
        let mut est = VitalsEstimate::degraded(&VitalRanges::default());
        let cal = CalibrationOffset {
            glucose: Some(200.0),
            viscosity: None,
            blood_pressure: Some((140.0, 90.0)),
        };
        apply_calibration(&mut est, &cal, 0.2);
        assert_abs_diff_eq!(est.glucose, 0.8 * 100.0 + 0.2 * 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(est.systolic, 124.0, epsilon = 1e-9);
        assert_abs_diff_eq!(est.diastolic, 82.0, epsilon = 1e-9);
        assert_eq!(est.viscosity, 3.5);
    }

    #[test]
    fn demographics_change_ranking() {
        let estimator = VitalsEstimator::new();
        let features = estimator.dataset().patterns[0].features;
        let senior = Demographics::new(70.0, Gender::Female);
        let pattern = estimator.dataset().get("senior-female").unwrap();
        let with = estimator.similarity(&features, pattern, Some(&senior));
        let without = estimator.similarity(&features, pattern, None);
        assert!(with > without);
    }

    #[test]
    fn identical_features_match_own_pattern() {
        let estimator = VitalsEstimator::new();
        let pattern = estimator.dataset().get("elevated-glucose").unwrap().clone();
        let ranked = estimator.rank_patterns(&pattern.features, None);
        assert_eq!(ranked[0].0.id, "elevated-glucose");
    }

    #[test]
    fn blend_weights_sum_to_one() {
        let estimator = VitalsEstimator::new();
        let est = run(&estimator, &sine(1.2, 300));
        assert_eq!(est.matches.len(), 3);
        let total: f64 = est.matches.iter().map(|m| m.weight).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn jitter_is_reproducible() {
        let config = EstimatorConfig {
            jitter: Some(JitterConfig { seed: 7, amplitude: 0.02 }),
            ..EstimatorConfig::default()
        };
        let estimator = VitalsEstimator::with_config(config, ReferenceDataset::builtin());
        let signal = sine(1.2, 300);
        let a = run(&estimator, &signal).estimate;
        let b = run(&estimator, &signal).estimate;
        assert_eq!(a, b);
        let plain = run(&VitalsEstimator::new(), &signal).estimate;
        assert_ne!(a.glucose, plain.glucose);
    }

    #[test]
    fn state_machine_transitions() {
        let s = EstimatorState::Accumulating;
        assert_eq!(s.on_sample(10, 90), EstimatorState::Accumulating);
        assert_eq!(s.on_sample(90, 90), EstimatorState::Ready);
        assert!(EstimatorState::Ready.can_estimate());
        assert_eq!(EstimatorState::Idle.on_sample(500, 90), EstimatorState::Idle);
        assert!(!EstimatorState::Accumulating.can_estimate());
    }
}

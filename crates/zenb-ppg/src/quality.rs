//! Quality/Confidence Scorer
//!
//! Confidence measures the window's self-consistency; accuracy further
//! blends in agreement with the reference catalog and is capped lower.
//!
//! SNR, stability and amplitude say little about noise that survived the
//! band-pass, so the weighted base is scaled by two rhythm factors: the
//! periodicity at the beat lag and the purity of the in-band spectrum.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::QualityConfig;
use crate::numeric::{stats, EPSILON};
use crate::vitals::{EstimateStatus, VitalsEstimate};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub snr_db: f64,
    /// [0, 1]
    pub snr_score: f64,
    /// [0, 1]
    pub stability: f64,
    /// [0, 1]
    pub amplitude_score: f64,
    /// [0, 1], from the beat-lag periodicity
    pub rhythm_score: f64,
    /// [0, 1], from the in-band spectral entropy
    pub spectral_score: f64,
    /// Percent
    pub confidence: f64,
    /// Percent
    pub accuracy: f64,
}

/// Heart-rate evidence a window's scores depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhythmEvidence {
    /// Normalized autocorrelation at the beat lag
    pub periodicity: f64,
    /// Normalized in-band spectral entropy
    pub spectral_entropy: f64,
    /// Heart rate came from the population default
    pub fallback: bool,
}

impl RhythmEvidence {
    pub fn new(periodicity: f64, spectral_entropy: f64, fallback: bool) -> Self {
        Self {
            periodicity,
            spectral_entropy,
            fallback,
        }
    }
}

pub struct QualityScorer {
    config: QualityConfig,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::with_config(QualityConfig::default())
    }

    pub fn with_config(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Score a conditioned window.
    ///
    /// * `peaks` - detected peak indices
    /// * `agreement` - best reference similarity in [0, 1]
    /// * `rhythm` - periodicity, spectral entropy and fallback flag
    pub fn score(
        &self,
        signal: &Array1<f64>,
        peaks: &[usize],
        agreement: f64,
        rhythm: RhythmEvidence,
    ) -> QualityMetrics {
        let y = signal.to_vec();
        let c = &self.config;

        let snr_db = snr_db(&y, peaks);
        let snr_score = (snr_db / c.snr_full_scale_db.max(EPSILON)).clamp(0.0, 1.0);
        let stability = stability(&y, c.segments);
        let amplitude_score = self.amplitude_score(&y);

        let weight_sum = (c.snr_weight + c.stability_weight + c.amplitude_weight).max(EPSILON);
        let base = (c.snr_weight * snr_score
            + c.stability_weight * stability
            + c.amplitude_weight * amplitude_score)
            / weight_sum;
        let (pb, eb) = (c.periodicity_band, c.entropy_band);
        let rhythm_score = ramp(rhythm.periodicity, pb.min, pb.max);
        let spectral_score = 1.0 - ramp(rhythm.spectral_entropy, eb.min, eb.max);
        let base = base * rhythm_score * spectral_score;

        let sw = c.similarity_weight.clamp(0.0, 1.0);
        let mut confidence = 100.0 * base;
        let mut accuracy = 100.0 * ((1.0 - sw) * base + sw * agreement.clamp(0.0, 1.0));
        if rhythm.fallback {
            confidence = confidence.min(c.fallback_confidence_cap);
            accuracy = accuracy.min(c.fallback_accuracy_cap);
        }

        QualityMetrics {
            snr_db,
            snr_score,
            stability,
            amplitude_score,
            rhythm_score,
            spectral_score,
            confidence: c.confidence_bounds.clamp(confidence),
            accuracy: c.accuracy_bounds.clamp(accuracy),
        }
    }

    /// Copy scores into the estimate and set its status.
    pub fn apply(&self, estimate: &mut VitalsEstimate, metrics: &QualityMetrics) {
        estimate.confidence = metrics.confidence;
        estimate.accuracy = metrics.accuracy;
        estimate.status = if metrics.confidence >= self.config.low_quality_threshold {
            EstimateStatus::Valid
        } else {
            EstimateStatus::LowQuality
        };
    }

    /// 1 inside the expected band, decaying with relative distance outside.
    fn amplitude_score(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let (lo, hi) = y
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let amplitude = hi - lo;
        let band = self.config.expected_amplitude;
        if !amplitude.is_finite() || amplitude <= 0.0 {
            0.0
        } else if amplitude < band.min {
            amplitude / band.min
        } else if amplitude > band.max {
            band.max / amplitude
        } else {
            1.0
        }
    }
}

/// 0 at or below `lo`, 1 at or above `hi`, linear between.
fn ramp(value: f64, lo: f64, hi: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    ((value - lo) / (hi - lo).max(EPSILON)).clamp(0.0, 1.0)
}

/// Mean power at the peaks over mean sample-to-sample difference power, in
/// dB. Without peaks the window variance stands in for peak power.
pub fn snr_db(y: &[f64], peaks: &[usize]) -> f64 {
    if y.len() < 2 {
        return 0.0;
    }
    let m = stats::mean(y);
    let signal_power = if peaks.is_empty() {
        stats::variance(y)
    } else {
        peaks.iter().map(|&i| (y[i] - m).powi(2)).sum::<f64>() / peaks.len() as f64
    };
    let noise_power =
        y.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>() / (y.len() - 1) as f64;
    if signal_power <= EPSILON {
        return 0.0;
    }
    let ratio = signal_power / noise_power.max(EPSILON);
    let db = 10.0 * ratio.log10();
    if db.is_finite() {
        db
    } else {
        0.0
    }
}

/// `1 / (1 + cv)` where cv is the spread of per-segment means relative to
/// the window's standard deviation.
pub fn stability(y: &[f64], segments: usize) -> f64 {
    let segments = segments.max(1);
    if y.len() < segments * 2 {
        return 0.0;
    }
    let len = y.len() / segments;
    let means: Vec<f64> = y.chunks(len).take(segments).map(stats::mean).collect();
    let spread = stats::std_dev(&means);
    let scale = stats::std_dev(y);
    if scale < EPSILON {
        return 0.0;
    }
    1.0 / (1.0 + spread / scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    const CLEAN: RhythmEvidence = RhythmEvidence {
        periodicity: 0.98,
        spectral_entropy: 0.3,
        fallback: false,
    };

    fn sine(n: usize, amp: f64) -> Array1<f64> {
        (0..n).map(|i| amp * (2.0 * PI * 1.2 * i as f64 / 30.0).sin()).collect()
    }

    #[test]
    fn clean_sine_scores_high() {
        let scorer = QualityScorer::new();
        let y = sine(300, 3.0);
        let peaks: Vec<usize> = (0..12).map(|k| 6 + 25 * k).collect();
        let q = scorer.score(&y, &peaks, 0.9, CLEAN);
        assert!(q.snr_db > 10.0);
        assert!(q.stability > 0.8);
        assert_eq!(q.amplitude_score, 1.0);
        assert_eq!(q.rhythm_score, 1.0);
        assert_eq!(q.spectral_score, 1.0);
        assert!(q.confidence > 70.0);
        assert!(q.accuracy <= 95.0);
    }

    #[test]
    fn fallback_caps_scores() {
        let scorer = QualityScorer::new();
        let rhythm = RhythmEvidence { fallback: true, ..CLEAN };
        let q = scorer.score(&sine(300, 3.0), &[], 1.0, rhythm);
        assert!(q.confidence <= 30.0);
        assert!(q.accuracy <= 25.0);
        assert!(q.confidence >= 10.0);
    }

    #[test]
    fn weak_rhythm_caps_confidence() {
        // clean-looking amplitude and SNR, but barely periodic and a
        // broad spectrum, as band-limited noise tends to be
        let scorer = QualityScorer::new();
        let y = sine(300, 3.0);
        let peaks: Vec<usize> = (0..12).map(|k| 6 + 25 * k).collect();
        let rhythm = RhythmEvidence::new(0.6, 0.7, false);
        let q = scorer.score(&y, &peaks, 0.9, rhythm);
        assert!(q.confidence < 40.0, "confidence {:.1}", q.confidence);
        assert_abs_diff_eq!(q.rhythm_score, 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(q.spectral_score, 2.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn broad_spectrum_alone_lowers_confidence() {
        let scorer = QualityScorer::new();
        let y = sine(300, 3.0);
        let peaks: Vec<usize> = (0..12).map(|k| 6 + 25 * k).collect();
        let sharp = scorer.score(&y, &peaks, 0.9, CLEAN);
        let broad = RhythmEvidence { spectral_entropy: 0.85, ..CLEAN };
        let broad = scorer.score(&y, &peaks, 0.9, broad);
        assert!(broad.confidence < 0.5 * sharp.confidence);
    }

    #[test]
    fn noise_has_poor_snr() {
        let mut rng = StdRng::seed_from_u64(11);
        let y: Vec<f64> = (0..300).map(|_| rng.gen_range(-1.0..1.0)).collect();
        assert!(snr_db(&y, &[]) < 0.0);
    }

    #[test]
    fn drifting_segments_reduce_stability() {
        let steady = sine(300, 1.0).to_vec();
        let drifting: Vec<f64> = steady.iter().enumerate().map(|(i, v)| v + i as f64 * 0.05).collect();
        assert!(stability(&drifting, 5) < stability(&steady, 5));
    }

    #[test]
    fn flat_signal_floors_confidence() {
        let scorer = QualityScorer::new();
        let q = scorer.score(&Array1::zeros(120), &[], 0.0, CLEAN);
        assert_eq!(q.confidence, 10.0);
        assert_eq!(q.accuracy, 10.0);
    }

    #[test]
    fn status_follows_threshold() {
        let scorer = QualityScorer::new();
        let mut est = VitalsEstimate::degraded(&crate::config::VitalRanges::default());
        let mut q = scorer.score(&sine(300, 3.0), &[], 0.5, CLEAN);
        q.confidence = 40.0;
        scorer.apply(&mut est, &q);
        assert_eq!(est.status, EstimateStatus::LowQuality);
        q.confidence = 80.0;
        scorer.apply(&mut est, &q);
        assert_eq!(est.status, EstimateStatus::Valid);
    }
}

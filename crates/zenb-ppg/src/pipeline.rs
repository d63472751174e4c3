//! End-to-end processing chain: Conditioner -> Feature Extractor ->
//! Vitals Estimator -> Quality Scorer.
//!
//! [`VitalsPipeline::analyze`] is a pure function of its inputs; calling it
//! twice on the same window yields the same estimate.
//!
//! Two windows are refused outright: one shorter than the estimator's
//! minimum, and one whose red channel never changes (covered lens, frozen
//! camera). Both map to a population-default estimate with zero confidence.

use ndarray::Array1;

use crate::conditioner::SignalConditioner;
use crate::config::PpgConfig;
use crate::error::{PpgError, Result};
use crate::estimator::{HeartRateDetail, MatchedPattern, VitalsEstimator};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::numeric::{stats, EPSILON};
use crate::quality::{QualityMetrics, QualityScorer, RhythmEvidence};
use crate::reference::ReferenceDataset;
use crate::sampler::{Channel, Sample};
use crate::vitals::{CalibrationOffset, Demographics, EstimateStatus, VitalsEstimate};

/// Everything computed for one window.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub estimate: VitalsEstimate,
    pub conditioned: Array1<f64>,
    pub features: FeatureVector,
    pub peaks: Vec<usize>,
    pub heart_rate: HeartRateDetail,
    pub quality: QualityMetrics,
    pub matches: Vec<MatchedPattern>,
}

pub struct VitalsPipeline {
    conditioner: SignalConditioner,
    extractor: FeatureExtractor,
    estimator: VitalsEstimator,
    scorer: QualityScorer,
    min_samples: usize,
}

impl Default for VitalsPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl VitalsPipeline {
    pub fn new() -> Self {
        Self::with_config(&PpgConfig::default(), ReferenceDataset::builtin())
    }

    pub fn with_config(config: &PpgConfig, dataset: ReferenceDataset) -> Self {
        Self {
            conditioner: SignalConditioner::with_config(config.conditioner.clone()),
            extractor: FeatureExtractor::with_config(config.features.clone()),
            estimator: VitalsEstimator::with_config(config.estimator.clone(), dataset),
            scorer: QualityScorer::with_config(config.quality.clone()),
            min_samples: config.estimator.min_samples,
        }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn estimator(&self) -> &VitalsEstimator {
        &self.estimator
    }

    /// Estimate vitals for a window. Windows below the minimum length give
    /// a degraded estimate marked `InsufficientSamples`.
    pub fn analyze(
        &self,
        samples: &[Sample],
        demographics: Option<&Demographics>,
        calibration: Option<&CalibrationOffset>,
    ) -> VitalsEstimate {
        match self.analyze_detailed(samples, demographics, calibration) {
            Ok(report) => report.estimate,
            Err(e) => self.degraded(&e),
        }
    }

    /// Estimate reported in place of a refused window.
    pub fn degraded(&self, error: &PpgError) -> VitalsEstimate {
        let mut estimate = VitalsEstimate::degraded(&self.estimator.config().ranges);
        if matches!(error, PpgError::DegenerateSignal(_)) {
            estimate.status = EstimateStatus::LowQuality;
        }
        estimate
    }

    /// Like [`analyze`](Self::analyze) but keeps the intermediates and
    /// reports a short or flat window as an error.
    pub fn analyze_detailed(
        &self,
        samples: &[Sample],
        demographics: Option<&Demographics>,
        calibration: Option<&CalibrationOffset>,
    ) -> Result<PipelineReport> {
        if samples.len() < self.min_samples {
            return Err(PpgError::InsufficientSamples {
                have: samples.len(),
                need: self.min_samples,
            });
        }

        let red: Vec<f64> = samples.iter().map(|s| s.channel(Channel::Red)).collect();
        if stats::std_dev(&red) < EPSILON {
            return Err(PpgError::DegenerateSignal(format!(
                "red channel flat across {} samples",
                samples.len()
            )));
        }

        let conditioned = self.conditioner.condition_samples(samples, Channel::Red);
        let extraction = self.extractor.extract(&conditioned, samples);
        let estimation =
            self.estimator
                .estimate(&conditioned, &extraction, demographics, calibration);
        let quality = self.scorer.score(
            &conditioned,
            &extraction.peaks,
            estimation.agreement,
            RhythmEvidence::new(
                estimation.heart_rate.periodicity,
                extraction.features.spectral_entropy,
                estimation.heart_rate.fallback,
            ),
        );

        let mut estimate = estimation.estimate;
        self.scorer.apply(&mut estimate, &quality);
        log::debug!(
            "window of {} samples: hr={:.1} conf={:.0} acc={:.0} ({:?})",
            samples.len(),
            estimate.heart_rate,
            estimate.confidence,
            estimate.accuracy,
            estimate.status
        );

        Ok(PipelineReport {
            estimate,
            conditioned,
            features: extraction.features,
            peaks: extraction.peaks,
            heart_rate: estimation.heart_rate,
            quality,
            matches: estimation.matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_window_is_degraded() {
        let pipeline = VitalsPipeline::new();
        let samples = vec![Sample::red_only(180.0); 30];
        let est = pipeline.analyze(&samples, None, None);
        assert_eq!(est.status, EstimateStatus::InsufficientSamples);
        assert_eq!(est.confidence, 0.0);
        assert!(matches!(
            pipeline.analyze_detailed(&samples, None, None),
            Err(PpgError::InsufficientSamples { have: 30, need: 90 })
        ));
    }

    #[test]
    fn flat_window_is_refused() {
        let pipeline = VitalsPipeline::new();
        let samples = vec![Sample::new(180.0, 60.0, 45.0); 150];
        let err = pipeline.analyze_detailed(&samples, None, None).unwrap_err();
        assert!(matches!(err, PpgError::DegenerateSignal(_)));
        let est = pipeline.analyze(&samples, None, None);
        assert_eq!(est.status, EstimateStatus::LowQuality);
        assert_eq!(est.confidence, 0.0);
        assert_eq!(est.heart_rate, 72.0);
    }

    #[test]
    fn report_keeps_window_length() {
        let pipeline = VitalsPipeline::new();
        let samples: Vec<Sample> = (0..150)
            .map(|i| Sample::red_only(180.0 + 2.0 * (i as f64 * 0.25).sin()))
            .collect();
        let report = pipeline.analyze_detailed(&samples, None, None).unwrap();
        assert_eq!(report.conditioned.len(), 150);
        assert_eq!(report.matches.len(), 3);
    }
}

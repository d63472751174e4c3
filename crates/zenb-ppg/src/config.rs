use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::sampler::RoiPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Closed interval used for physiological clamp ranges and expected bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.min
        }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(ConfigError::Validation(format!(
                "{} bounds invalid: [{}, {}]",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PpgConfig {
    pub sampler: SamplerConfig,
    pub conditioner: ConditionerConfig,
    pub features: FeatureConfig,
    pub estimator: EstimatorConfig,
    pub quality: QualityConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Camera frame rate (Hz)
    pub frame_rate: f64,
    /// Region-of-interest selection policy
    pub roi_policy: RoiPolicy,
    /// Read every n-th pixel in both axes
    pub pixel_stride: usize,
    /// Extra score weight given to bright red regions while the torch is on
    pub flash_boost: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SmoothingKind {
    MovingAverage,
    SavitzkyGolay { order: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionerConfig {
    pub sample_rate: f64,
    /// IQR multiplier for outlier clipping
    pub iqr_factor: f64,
    pub smoothing: SmoothingKind,
    pub smoothing_window: usize,
    /// High-pass corner (Hz)
    pub low_cut_hz: f64,
    /// Low-pass corner (Hz)
    pub high_cut_hz: f64,
    pub median_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub sample_rate: f64,
    /// Neighbours on each side a peak must dominate
    pub peak_neighbors: usize,
    /// Peaks must clear mean + k * std (valleys mean - k * std)
    pub peak_threshold_k: f64,
    /// Minimum time between accepted peaks (seconds)
    pub min_peak_spacing_secs: f64,
    /// Largest transform used for spectral descriptors
    pub max_fft_size: usize,
    /// Band considered physiological for spectral descriptors (Hz)
    pub pulse_band: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalRanges {
    pub heart_rate: Bounds,
    pub spo2: Bounds,
    pub systolic: Bounds,
    pub diastolic: Bounds,
    /// mg/dL
    pub glucose: Bounds,
    /// cP
    pub viscosity: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Age difference (years) at which the age bonus decays by 1/e
    pub age_scale: f64,
    pub age_weight: f64,
    pub gender_bonus: f64,
    /// Bonus per unit of the pattern's declared accuracy
    pub accuracy_bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JitterConfig {
    pub seed: u64,
    /// Relative amplitude, e.g. 0.01 = +/-1 %
    pub amplitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub sample_rate: f64,
    /// Samples needed before the estimator leaves `Accumulating`
    pub min_samples: usize,
    /// Population average used when no rhythm can be found
    pub default_heart_rate: f64,
    pub interval_iqr_factor: f64,
    /// Validated inter-peak intervals needed before peaks are trusted
    pub min_intervals: usize,
    /// Normalized autocorrelation at the beat lag required to trust peaks
    pub min_periodicity: f64,
    pub top_k: usize,
    pub accuracy_exponent: f64,
    pub ratio_bounds: Bounds,
    /// Minimum systolic - diastolic gap (mmHg)
    pub min_bp_gap: f64,
    pub ranges: VitalRanges,
    /// Fraction pulled toward the user's calibration reference (0.2 = 80 % model)
    pub calibration_pull: f64,
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub jitter: Option<JitterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Number of segments for the stability score
    pub segments: usize,
    pub snr_weight: f64,
    pub stability_weight: f64,
    pub amplitude_weight: f64,
    /// Weight of reference-catalog agreement in the accuracy score
    pub similarity_weight: f64,
    /// SNR (dB) mapped to a full score
    pub snr_full_scale_db: f64,
    /// Expected peak-to-peak amplitude of the conditioned signal
    pub expected_amplitude: Bounds,
    /// Percent
    pub confidence_bounds: Bounds,
    /// Percent
    pub accuracy_bounds: Bounds,
    /// Beat-lag periodicity mapped from a zero rhythm score (min) to a
    /// full one (max)
    pub periodicity_band: Bounds,
    /// In-band spectral entropy mapped from a full spectral score (min)
    /// to zero (max)
    pub entropy_band: Bounds,
    /// Caps applied when no heartbeat rhythm was found
    pub fallback_confidence_cap: f64,
    pub fallback_accuracy_cap: f64,
    /// Confidence below which an estimate is flagged `LowQuality`
    pub low_quality_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Period of the sampling cadence used by `Session::drive`
    pub sampling_interval_ms: u64,
    pub processing_interval_ms: u64,
    pub recording_window_secs: f64,
    /// Compute a final estimate on stop
    pub flush_final: bool,
    pub use_illumination: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            roi_policy: RoiPolicy::default(),
            pixel_stride: 2,
            flash_boost: 0.5,
        }
    }
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            iqr_factor: 1.5,
            smoothing: SmoothingKind::MovingAverage,
            smoothing_window: 5,
            low_cut_hz: 0.5,
            high_cut_hz: 4.5,
            median_window: 5,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            peak_neighbors: 3,
            peak_threshold_k: 0.5,
            min_peak_spacing_secs: 0.3,
            max_fft_size: 512,
            pulse_band: Bounds::new(0.5, 4.5),
        }
    }
}

impl Default for VitalRanges {
    fn default() -> Self {
        Self {
            heart_rate: Bounds::new(40.0, 200.0),
            spo2: Bounds::new(85.0, 100.0),
            systolic: Bounds::new(85.0, 200.0),
            diastolic: Bounds::new(55.0, 120.0),
            glucose: Bounds::new(70.0, 300.0),
            viscosity: Bounds::new(1.2, 6.0),
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            age_scale: 15.0,
            age_weight: 0.1,
            gender_bonus: 0.05,
            accuracy_bonus: 0.1,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            min_samples: 90, // 3 s @ 30 fps
            default_heart_rate: 72.0,
            interval_iqr_factor: 1.5,
            min_intervals: 2,
            min_periodicity: 0.5,
            top_k: 3,
            accuracy_exponent: 2.0,
            ratio_bounds: Bounds::new(0.6, 1.8),
            min_bp_gap: 20.0,
            ranges: VitalRanges::default(),
            calibration_pull: 0.2,
            similarity: SimilarityConfig::default(),
            jitter: None,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            segments: 5,
            snr_weight: 0.4,
            stability_weight: 0.3,
            amplitude_weight: 0.3,
            similarity_weight: 0.2,
            snr_full_scale_db: 20.0,
            expected_amplitude: Bounds::new(0.5, 30.0),
            confidence_bounds: Bounds::new(10.0, 98.0),
            accuracy_bounds: Bounds::new(10.0, 95.0),
            periodicity_band: Bounds::new(0.5, 0.9),
            entropy_band: Bounds::new(0.6, 0.9),
            fallback_confidence_cap: 30.0,
            fallback_accuracy_cap: 25.0,
            low_quality_threshold: 50.0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 33,
            processing_interval_ms: 2_000,
            recording_window_secs: 15.0,
            flush_final: true,
            use_illumination: true,
        }
    }
}

impl PpgConfig {
    /// Defaults re-targeted to another camera frame rate.
    pub fn with_frame_rate(frame_rate: f64) -> Self {
        let mut config = Self::default();
        config.set_frame_rate(frame_rate);
        config
    }

    /// Propagate a frame rate to every stage and rescale the sample-count
    /// minimum so it still covers the same 3 s.
    pub fn set_frame_rate(&mut self, frame_rate: f64) {
        let seconds = self.estimator.min_samples as f64 / self.estimator.sample_rate.max(1e-6);
        self.sampler.frame_rate = frame_rate;
        self.conditioner.sample_rate = frame_rate;
        self.features.sample_rate = frame_rate;
        self.estimator.sample_rate = frame_rate;
        self.estimator.min_samples = (seconds * frame_rate).round().max(1.0) as usize;
        self.session.sampling_interval_ms = (1000.0 / frame_rate.max(1e-6)).round() as u64;
    }

    /// Capacity of the sliding signal buffer
    pub fn buffer_capacity(&self) -> usize {
        (self.sampler.frame_rate * self.session.recording_window_secs)
            .round()
            .max(1.0) as usize
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: PpgConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    /// Variables are prefixed with ZENB_PPG_, e.g. ZENB_PPG_FRAME_RATE=60
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        use std::env;

        if let Ok(val) = env::var("ZENB_PPG_FRAME_RATE") {
            let fps: f64 = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid ZENB_PPG_FRAME_RATE".to_string())
            })?;
            self.set_frame_rate(fps);
        }
        if let Ok(val) = env::var("ZENB_PPG_MIN_SAMPLES") {
            self.estimator.min_samples = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid ZENB_PPG_MIN_SAMPLES".to_string())
            })?;
        }
        if let Ok(val) = env::var("ZENB_PPG_WINDOW_SECS") {
            self.session.recording_window_secs = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid ZENB_PPG_WINDOW_SECS".to_string())
            })?;
        }
        if let Ok(val) = env::var("ZENB_PPG_CALIBRATION_PULL") {
            self.estimator.calibration_pull = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid ZENB_PPG_CALIBRATION_PULL".to_string())
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            self.sampler.frame_rate,
            self.conditioner.sample_rate,
            self.features.sample_rate,
            self.estimator.sample_rate,
        ];
        if rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(ConfigError::Validation(
                "frame/sample rates must be positive".to_string(),
            ));
        }
        if self.sampler.pixel_stride == 0 {
            return Err(ConfigError::Validation("pixel_stride must be >= 1".to_string()));
        }
        self.sampler.roi_policy.validate()?;

        let c = &self.conditioner;
        if c.low_cut_hz <= 0.0 || c.high_cut_hz <= c.low_cut_hz {
            return Err(ConfigError::Validation(format!(
                "band-pass corners inverted: {} .. {} Hz",
                c.low_cut_hz, c.high_cut_hz
            )));
        }
        if c.smoothing_window == 0 || c.median_window == 0 {
            return Err(ConfigError::Validation(
                "smoothing and median windows must be non-empty".to_string(),
            ));
        }
        if let SmoothingKind::SavitzkyGolay { order } = c.smoothing {
            if order + 1 >= c.smoothing_window.max(1) {
                return Err(ConfigError::Validation(
                    "Savitzky-Golay order must be below window - 1".to_string(),
                ));
            }
        }

        self.features.pulse_band.validate("pulse_band")?;
        if self.features.max_fft_size < 8 {
            return Err(ConfigError::Validation("max_fft_size must be >= 8".to_string()));
        }

        let e = &self.estimator;
        if e.min_samples < 2 * self.features.peak_neighbors + 2 {
            return Err(ConfigError::Validation(format!(
                "min_samples {} too small for peak detection",
                e.min_samples
            )));
        }
        if e.min_intervals == 0 {
            return Err(ConfigError::Validation("min_intervals must be >= 1".to_string()));
        }
        if e.top_k == 0 {
            return Err(ConfigError::Validation("top_k must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&e.calibration_pull) {
            return Err(ConfigError::Validation(format!(
                "calibration_pull must lie in [0, 1], got {}",
                e.calibration_pull
            )));
        }
        e.ratio_bounds.validate("ratio_bounds")?;
        e.ranges.heart_rate.validate("heart_rate")?;
        e.ranges.spo2.validate("spo2")?;
        e.ranges.systolic.validate("systolic")?;
        e.ranges.diastolic.validate("diastolic")?;
        e.ranges.glucose.validate("glucose")?;
        e.ranges.viscosity.validate("viscosity")?;

        let q = &self.quality;
        if q.segments == 0 {
            return Err(ConfigError::Validation("quality segments must be >= 1".to_string()));
        }
        q.expected_amplitude.validate("expected_amplitude")?;
        q.confidence_bounds.validate("confidence_bounds")?;
        q.accuracy_bounds.validate("accuracy_bounds")?;
        for (band, name) in [
            (q.periodicity_band, "periodicity_band"),
            (q.entropy_band, "entropy_band"),
        ] {
            band.validate(name)?;
            if band.max - band.min < 1e-6 {
                return Err(ConfigError::Validation(format!("{} must have width", name)));
            }
        }

        let s = &self.session;
        if s.recording_window_secs <= 0.0 {
            return Err(ConfigError::Validation(
                "recording_window_secs must be positive".to_string(),
            ));
        }
        if s.sampling_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "sampling_interval_ms must be positive".to_string(),
            ));
        }
        if s.processing_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "processing_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PpgConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_capacity(), 450);
        assert_eq!(config.estimator.min_samples, 90);
    }

    #[test]
    fn frame_rate_rescales_minimum() {
        let config = PpgConfig::with_frame_rate(60.0);
        assert_eq!(config.estimator.min_samples, 180);
        assert_eq!(config.buffer_capacity(), 900);
        assert_eq!(config.session.sampling_interval_ms, 17);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn collapsed_quality_band_rejected() {
        let mut config = PpgConfig::default();
        config.quality.entropy_band = Bounds::new(0.7, 0.7);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn inverted_band_rejected() {
        let mut config = PpgConfig::default();
        config.conditioner.low_cut_hz = 5.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn calibration_pull_out_of_range_rejected() {
        let mut config = PpgConfig::default();
        config.estimator.calibration_pull = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = PpgConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: PpgConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.estimator.top_k, config.estimator.top_k);
        assert_eq!(parsed.sampler.roi_policy, config.sampler.roi_policy);
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ppg.toml");
        let mut config = PpgConfig::default();
        config.estimator.calibration_pull = 0.3;
        fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = PpgConfig::from_file(&path).unwrap();
        assert!((loaded.estimator.calibration_pull - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn bounds_clamp_non_finite_to_min() {
        let b = Bounds::new(1.2, 6.0);
        assert_eq!(b.clamp(f64::NAN), 1.2);
        assert_eq!(b.clamp(9.0), 6.0);
        assert_eq!(b.clamp(3.0), 3.0);
    }
}

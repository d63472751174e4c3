//! # zenb-ppg
//!
//! Fingertip-camera photoplethysmography for ZenB.
//!
//! This crate provides:
//! - **Frame sampling**: RGBA frame to per-frame channel means, multi-region ROI
//! - **Signal conditioning**: IQR clipping, smoothing, band-pass, median denoise
//! - **Feature extraction**: moments, spectral descriptors, peak structure
//! - **Vitals estimation**: heart rate plus a reference-pattern ensemble for
//!   SpO2, blood pressure, glucose and viscosity
//! - **Quality scoring**: confidence and accuracy from SNR, stability, amplitude
//! - **Numerics**: the interpolation, calculus, regression, spectral and
//!   filtering primitives the stages above are built on
//!
//! Estimates are heuristic and not suitable for medical use.
//!
//! ## Example
//!
//! ```ignore
//! use zenb_ppg::{Sample, VitalsPipeline};
//!
//! let pipeline = VitalsPipeline::new();
//! let samples: Vec<Sample> = camera_frames.iter().map(|f| f.sample).collect();
//!
//! let estimate = pipeline.analyze(&samples, None, None);
//! println!("{:.0} bpm, confidence {:.0}%", estimate.heart_rate, estimate.confidence);
//! ```

pub mod conditioner;
pub mod config;
pub mod error;
pub mod estimator;
pub mod features;
pub mod history;
pub mod numeric;
pub mod peripheral;
pub mod pipeline;
pub mod quality;
pub mod reference;
pub mod sampler;
pub mod session;
pub mod vitals;

pub use conditioner::SignalConditioner;
pub use config::{ConfigError, PpgConfig};
pub use error::{PpgError, Result};
pub use estimator::{EstimatorState, HeartRateDetail, MatchedPattern, VitalsEstimator};
pub use features::{FeatureExtractor, FeatureVector};
pub use history::{MeasurementSink, VitalsHistory};
pub use peripheral::PeripheralReading;
pub use pipeline::{PipelineReport, VitalsPipeline};
pub use quality::{QualityMetrics, QualityScorer, RhythmEvidence};
pub use reference::{ReferenceDataset, ReferencePattern};
pub use sampler::{
    FrameSampler, Illumination, NoIllumination, RgbaFrame, Roi, RoiMode, RoiPolicy, Sample,
    SharedBuffer, SignalBuffer,
};
pub use session::{Session, TickEvent};
pub use vitals::{CalibrationOffset, Demographics, EstimateStatus, Gender, VitalsEstimate};

//! Frame Sampler
//!
//! Reduces one RGBA camera frame to a single [`Sample`] of channel means.
//! The region of interest is either a fixed centre crop or the best of
//! several concentric candidates, scored by
//! `signal_strength * red_dominance * flash_multiplier`.

pub mod buffer;
pub mod frame;
pub mod illumination;

pub use buffer::{Channel, Sample, SharedBuffer, SignalBuffer};
pub use frame::{RgbaFrame, Roi};
pub use illumination::{Illumination, NoIllumination};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SamplerConfig};
use crate::numeric::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoiMode {
    /// One centred crop of `center_fraction` of the frame area
    CenterCrop,
    /// Score every candidate fraction and keep the best region
    MultiRegion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiPolicy {
    pub mode: RoiMode,
    pub center_fraction: f64,
    /// Area fractions of the concentric candidates
    pub candidate_fractions: Vec<f64>,
}

impl Default for RoiPolicy {
    fn default() -> Self {
        Self {
            mode: RoiMode::MultiRegion,
            center_fraction: 0.5,
            candidate_fractions: vec![0.16, 0.25, 0.36, 0.49, 0.60],
        }
    }
}

impl RoiPolicy {
    pub fn center_crop(fraction: f64) -> Self {
        Self {
            mode: RoiMode::CenterCrop,
            center_fraction: fraction,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = |f: f64| f > 0.0 && f <= 1.0;
        match self.mode {
            RoiMode::CenterCrop if !valid(self.center_fraction) => Err(ConfigError::Validation(
                format!("center_fraction must lie in (0, 1], got {}", self.center_fraction),
            )),
            RoiMode::MultiRegion if self.candidate_fractions.is_empty() => Err(
                ConfigError::Validation("multi-region policy needs candidates".to_string()),
            ),
            RoiMode::MultiRegion if !self.candidate_fractions.iter().all(|&f| valid(f)) => {
                Err(ConfigError::Validation(
                    "candidate fractions must lie in (0, 1]".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    fn regions(&self, width: u32, height: u32) -> Vec<Roi> {
        match self.mode {
            RoiMode::CenterCrop => vec![Roi::centered(width, height, self.center_fraction)],
            RoiMode::MultiRegion => self
                .candidate_fractions
                .iter()
                .map(|&f| Roi::centered(width, height, f))
                .collect(),
        }
    }
}

/// Winning region for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSample {
    pub sample: Sample,
    pub roi: Roi,
    pub score: f64,
}

/// Per-frame region selection and channel reduction.
pub struct FrameSampler {
    config: SamplerConfig,
    illuminated: bool,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            illuminated: false,
        }
    }

    /// Switch the torch on. Absence of a torch is logged, not fatal.
    pub fn start(&mut self, torch: &mut dyn Illumination) {
        self.illuminated = illumination::enable(torch);
    }

    pub fn stop(&mut self, torch: &mut dyn Illumination) {
        if self.illuminated {
            illumination::disable(torch);
        }
        self.illuminated = false;
    }

    pub fn is_illuminated(&self) -> bool {
        self.illuminated
    }

    /// Composite score of a region's channel means.
    pub fn score(&self, rgb: [f64; 3]) -> f64 {
        let [r, g, b] = rgb;
        let signal_strength = r / 255.0;
        let red_dominance = r / (r + g + b + EPSILON);
        let flash = if self.illuminated {
            1.0 + self.config.flash_boost * r / 255.0
        } else {
            1.0
        };
        signal_strength * red_dominance * flash
    }

    pub fn process(&self, frame: &RgbaFrame<'_>) -> RegionSample {
        let stride = self.config.pixel_stride;
        let mut best: Option<RegionSample> = None;

        for roi in self.config.roi_policy.regions(frame.width(), frame.height()) {
            let rgb = frame.roi_mean_rgb(&roi, stride);
            let score = self.score(rgb);
            if best.map_or(true, |b| score > b.score) {
                best = Some(RegionSample {
                    sample: Sample::new(rgb[0], rgb[1], rgb[2]),
                    roi,
                    score,
                });
            }
        }

        best.unwrap_or(RegionSample {
            sample: Sample::new(0.0, 0.0, 0.0),
            roi: Roi::centered(frame.width(), frame.height(), 1.0),
            score: 0.0,
        })
    }

    /// Validate raw RGBA bytes and reduce them to a sample.
    pub fn process_raw(&self, data: &[u8], width: u32, height: u32) -> crate::Result<Sample> {
        let frame = RgbaFrame::new(data, width, height)?;
        Ok(self.process(&frame).sample)
    }
}

//! Vital-sign domain types shared by the estimator, the session driver and
//! the boundary adapters.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::VitalRanges;
use crate::error::PpgError;

/// Marks how much an estimate can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimateStatus {
    /// Confidence at or above the low-quality threshold.
    Valid,
    /// All fields populated but confidence is low.
    LowQuality,
    /// Buffer was below the minimum length; population defaults only.
    InsufficientSamples,
}

/// One processing cycle's output. Every field is always populated and
/// clamped to its physiological range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsEstimate {
    /// bpm
    pub heart_rate: f64,
    /// %
    pub spo2: f64,
    /// mmHg
    pub systolic: f64,
    /// mmHg
    pub diastolic: f64,
    /// mg/dL
    pub glucose: f64,
    /// cP
    pub viscosity: f64,
    /// 0-100
    pub confidence: f64,
    /// 0-100
    pub accuracy: f64,
    pub status: EstimateStatus,
}

impl VitalsEstimate {
    pub const DEFAULT_HEART_RATE: f64 = 72.0;
    pub const DEFAULT_SPO2: f64 = 97.0;
    pub const DEFAULT_SYSTOLIC: f64 = 120.0;
    pub const DEFAULT_DIASTOLIC: f64 = 80.0;
    pub const DEFAULT_GLUCOSE: f64 = 100.0;
    pub const DEFAULT_VISCOSITY: f64 = 3.5;

    /// Population-average estimate with zero confidence, used when too few
    /// samples were collected.
    pub fn degraded(ranges: &VitalRanges) -> Self {
        Self {
            heart_rate: ranges.heart_rate.clamp(Self::DEFAULT_HEART_RATE),
            spo2: ranges.spo2.clamp(Self::DEFAULT_SPO2),
            systolic: ranges.systolic.clamp(Self::DEFAULT_SYSTOLIC),
            diastolic: ranges.diastolic.clamp(Self::DEFAULT_DIASTOLIC),
            glucose: ranges.glucose.clamp(Self::DEFAULT_GLUCOSE),
            viscosity: ranges.viscosity.clamp(Self::DEFAULT_VISCOSITY),
            confidence: 0.0,
            accuracy: 0.0,
            status: EstimateStatus::InsufficientSamples,
        }
    }

    /// Blood pressure as `sys/dia`, rounded to whole mmHg.
    pub fn blood_pressure(&self) -> String {
        format!("{:.0}/{:.0}", self.systolic, self.diastolic)
    }

    pub fn is_degraded(&self) -> bool {
        self.status == EstimateStatus::InsufficientSamples
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = PpgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "x" => Ok(Gender::Other),
            other => Err(PpgError::Config(crate::config::ConfigError::Validation(format!(
                "unknown gender {:?}",
                other
            )))),
        }
    }
}

/// User demographics supplied by the calibration collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: f64,
    pub gender: Gender,
}

impl Demographics {
    pub fn new(age: f64, gender: Gender) -> Self {
        Self { age, gender }
    }
}

/// Optional user-declared reference values. Estimates are pulled toward
/// whichever of these are present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationOffset {
    pub glucose: Option<f64>,
    pub viscosity: Option<f64>,
    /// (systolic, diastolic)
    pub blood_pressure: Option<(f64, f64)>,
}

impl CalibrationOffset {
    pub fn is_empty(&self) -> bool {
        self.glucose.is_none() && self.viscosity.is_none() && self.blood_pressure.is_none()
    }

    /// Parse a `sys/dia` blood-pressure string such as `"120/80"`.
    pub fn parse_blood_pressure(text: &str) -> crate::Result<(f64, f64)> {
        let invalid = || {
            PpgError::Config(crate::config::ConfigError::Validation(format!(
                "blood pressure must look like 120/80, got {:?}",
                text
            )))
        };
        let (sys, dia) = text.split_once('/').ok_or_else(invalid)?;
        let sys: f64 = sys.trim().parse().map_err(|_| invalid())?;
        let dia: f64 = dia.trim().parse().map_err(|_| invalid())?;
        if !(sys.is_finite() && dia.is_finite()) || dia >= sys {
            return Err(invalid());
        }
        Ok((sys, dia))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_is_marked_and_in_range() {
        let ranges = VitalRanges::default();
        let est = VitalsEstimate::degraded(&ranges);
        assert!(est.is_degraded());
        assert_eq!(est.confidence, 0.0);
        assert_eq!(est.heart_rate, 72.0);
        assert!(est.diastolic < est.systolic);
        assert_eq!(est.blood_pressure(), "120/80");
    }

    #[test]
    fn gender_parsing() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!(" m ".parse::<Gender>().unwrap(), Gender::Male);
        assert!("robot".parse::<Gender>().is_err());
    }

    #[test]
    fn blood_pressure_parsing() {
        assert_eq!(CalibrationOffset::parse_blood_pressure("125/82").unwrap(), (125.0, 82.0));
        assert!(CalibrationOffset::parse_blood_pressure("80/120").is_err());
        assert!(CalibrationOffset::parse_blood_pressure("abc").is_err());
    }
}

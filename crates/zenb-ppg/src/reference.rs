//! Versioned reference-pattern catalog.
//!
//! Patterns pair a prototype [`FeatureVector`] and demographic profile with
//! known vitals and a declared accuracy. The catalog is read-only input to
//! the estimator; a built-in default ships with the crate and a
//! replacement can be loaded from JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PpgError, Result};
use crate::features::FeatureVector;
use crate::vitals::Gender;

const BUILTIN_DATASET: &str = include_str!("../data/reference_patterns.json");

/// Known vitals of a reference pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceVitals {
    pub heart_rate: f64,
    pub spo2: f64,
    pub systolic: f64,
    pub diastolic: f64,
    pub glucose: f64,
    pub viscosity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePattern {
    pub id: String,
    pub features: FeatureVector,
    pub age: f64,
    pub gender: Gender,
    pub vitals: ReferenceVitals,
    /// Declared accuracy in (0, 1]
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDataset {
    pub version: String,
    pub patterns: Vec<ReferencePattern>,
}

impl Default for ReferenceDataset {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceDataset {
    /// Catalog embedded in the crate.
    pub fn builtin() -> Self {
        match Self::from_json(BUILTIN_DATASET) {
            Ok(dataset) => dataset,
            Err(e) => {
                log::error!("embedded reference dataset rejected: {}", e);
                Self {
                    version: "empty".to_string(),
                    patterns: Vec::new(),
                }
            }
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let dataset: ReferenceDataset = serde_json::from_str(text)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let dataset = Self::from_json(&text)?;
        log::info!(
            "loaded reference dataset {} ({} patterns)",
            dataset.version,
            dataset.patterns.len()
        );
        Ok(dataset)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ReferencePattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            return Err(PpgError::Dataset("dataset has no patterns".to_string()));
        }
        for p in &self.patterns {
            let f = &p.features;
            if !(f.amplitude > 0.0 && f.dominant_frequency > 0.0) {
                return Err(PpgError::Dataset(format!(
                    "pattern {}: prototype amplitude and frequency must be positive",
                    p.id
                )));
            }
            if !(p.accuracy > 0.0 && p.accuracy <= 1.0) {
                return Err(PpgError::Dataset(format!(
                    "pattern {}: accuracy {} outside (0, 1]",
                    p.id, p.accuracy
                )));
            }
            if p.vitals.diastolic >= p.vitals.systolic {
                return Err(PpgError::Dataset(format!(
                    "pattern {}: diastolic must be below systolic",
                    p.id
                )));
            }
        }
        Ok(())
    }
}

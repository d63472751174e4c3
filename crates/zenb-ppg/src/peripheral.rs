//! Payloads from an external pulse-oximeter peripheral.
//!
//! The peripheral delivers `{hr, spo2}` pairs either as JSON
//! (`{"hr": 72, "spo2": 98}`) or as text (`HR:72,SPO2:98`). Parsed readings
//! map onto the heart-rate and SpO2 fields of a [`VitalsEstimate`].

use serde::{Deserialize, Serialize};

use crate::config::VitalRanges;
use crate::error::{PpgError, Result};
use crate::vitals::VitalsEstimate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralReading {
    pub hr: u32,
    pub spo2: u32,
}

impl PeripheralReading {
    pub fn parse(payload: &str) -> Result<Self> {
        let payload = payload.trim();
        if payload.starts_with('{') {
            return serde_json::from_str(payload)
                .map_err(|e| PpgError::PeripheralParse(format!("bad JSON payload: {}", e)));
        }
        Self::parse_text(payload)
    }

    fn parse_text(payload: &str) -> Result<Self> {
        let mut hr = None;
        let mut spo2 = None;
        for field in payload.split(',') {
            let (key, value) = field
                .split_once(':')
                .ok_or_else(|| PpgError::PeripheralParse(format!("missing ':' in {:?}", field)))?;
            let value: u32 = value.trim().parse().map_err(|_| {
                PpgError::PeripheralParse(format!("non-integer value in {:?}", field))
            })?;
            match key.trim().to_ascii_uppercase().as_str() {
                "HR" => hr = Some(value),
                "SPO2" => spo2 = Some(value),
                other => log::debug!("ignoring peripheral field {}", other),
            }
        }
        match (hr, spo2) {
            (Some(hr), Some(spo2)) => Ok(Self { hr, spo2 }),
            _ => Err(PpgError::PeripheralParse(format!(
                "expected HR and SPO2 in {:?}",
                payload
            ))),
        }
    }

    /// Overwrite heart rate and SpO2 with this reading, clamped to range.
    pub fn apply_to(&self, estimate: &mut VitalsEstimate, ranges: &VitalRanges) {
        estimate.heart_rate = ranges.heart_rate.clamp(self.hr as f64);
        estimate.spo2 = ranges.spo2.clamp(self.spo2 as f64);
    }
}

//! Measurement sink and CSV-exportable history.
//!
//! The pipeline never writes anywhere on its own. A session is handed an
//! optional [`MeasurementSink`] and reports each emitted estimate to it.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::vitals::VitalsEstimate;

pub const CSV_HEADER: [&str; 6] = [
    "Timestamp",
    "Heart Rate",
    "SpO2",
    "Blood Pressure",
    "Blood Sugar",
    "Blood Viscosity",
];

/// Receives every estimate a session emits.
pub trait MeasurementSink: Send {
    fn record(&mut self, estimate: &VitalsEstimate, at: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub estimate: VitalsEstimate,
}

impl HistoryEntry {
    fn csv_row(&self) -> [String; 6] {
        let e = &self.estimate;
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            format!("{:.0}", e.heart_rate),
            format!("{:.0}", e.spo2),
            e.blood_pressure(),
            format!("{:.0}", e.glucose),
            format!("{:.2}", e.viscosity),
        ]
    }
}

/// Append-only in-memory history.
#[derive(Debug, Clone, Default)]
pub struct VitalsHistory {
    entries: Vec<HistoryEntry>,
    /// Skip degraded (insufficient-sample) estimates
    skip_degraded: bool,
}

impl VitalsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipping_degraded() -> Self {
        Self {
            entries: Vec::new(),
            skip_degraded: true,
        }
    }

    pub fn push(&mut self, estimate: VitalsEstimate, timestamp: DateTime<Utc>) {
        if self.skip_degraded && estimate.is_degraded() {
            return;
        }
        self.entries.push(HistoryEntry { timestamp, estimate });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Write header and all rows.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for entry in &self.entries {
            wtr.write_record(entry.csv_row())?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    /// Append rows to `path`, writing the header only when the file is new
    /// or empty.
    pub fn append_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let fresh = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            wtr.write_record(CSV_HEADER)?;
        }
        for entry in &self.entries {
            wtr.write_record(entry.csv_row())?;
        }
        wtr.flush()?;
        log::debug!("appended {} rows to {}", self.entries.len(), path.display());
        Ok(())
    }
}

impl MeasurementSink for VitalsHistory {
    fn record(&mut self, estimate: &VitalsEstimate, at: DateTime<Utc>) {
        self.push(*estimate, at);
    }
}

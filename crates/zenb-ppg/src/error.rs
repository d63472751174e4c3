//! Error types for the PPG pipeline.
//!
//! The numeric stages never fail: degenerate input falls back to neutral
//! values. `PpgError` is reserved for I/O and configuration boundaries,
//! illumination control, and `VitalsPipeline::analyze_detailed`, which lets
//! a caller tell a degraded result apart from a real one.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum PpgError {
    #[error("insufficient samples: have {have}, need {need}")]
    InsufficientSamples { have: usize, need: usize },
    #[error("degenerate signal: {0}")]
    DegenerateSignal(String),
    #[error("numeric instability: {0}")]
    NumericInstability(String),
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("reference dataset error: {0}")]
    Dataset(String),
    #[error("peripheral payload error: {0}")]
    PeripheralParse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PpgError>;

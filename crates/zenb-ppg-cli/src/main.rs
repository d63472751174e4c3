use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use zenb_ppg::{
    CalibrationOffset, Demographics, Gender, PeripheralReading, PpgConfig, ReferenceDataset,
    Sample, VitalsHistory, VitalsPipeline,
};

#[derive(Parser)]
#[command(name = "zenb-ppg", about = "Fingertip PPG vitals from recorded samples")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate vitals from a red,green,blue CSV recording
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Frame rate of the recording (overrides config)
        #[arg(long)]
        fps: Option<f64>,
        #[arg(long)]
        age: Option<f64>,
        #[arg(long)]
        gender: Option<String>,
        /// TOML config; ZENB_PPG_* environment overrides apply
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSON reference dataset replacing the built-in one
        #[arg(long)]
        reference_dataset: Option<PathBuf>,
        #[arg(long)]
        reference_glucose: Option<f64>,
        #[arg(long)]
        reference_viscosity: Option<f64>,
        /// Known blood pressure as sys/dia
        #[arg(long)]
        reference_bp: Option<String>,
        /// Append the estimate to this history CSV
        #[arg(long)]
        history: Option<PathBuf>,
        /// Print intermediate features and quality metrics
        #[arg(long)]
        detailed: bool,
    },
    /// Write a synthetic red,green,blue recording
    Synth {
        #[arg(long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(long, default_value_t = 15.0)]
        seconds: f64,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
        #[arg(long, default_value_t = 0.3)]
        noise: f64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long)]
        output: PathBuf,
    },
    /// Parse a pulse-oximeter payload (JSON or HR:<n>,SPO2:<n>)
    Peripheral { payload: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Analyze {
            input,
            fps,
            age,
            gender,
            config,
            reference_dataset,
            reference_glucose,
            reference_viscosity,
            reference_bp,
            history,
            detailed,
        } => {
            let mut config = match config {
                Some(path) => PpgConfig::from_file_with_env(path)?,
                None => PpgConfig::default(),
            };
            if let Some(fps) = fps {
                config.set_frame_rate(fps);
                config.validate()?;
            }
            let dataset = match reference_dataset {
                Some(path) => ReferenceDataset::from_file(path)?,
                None => ReferenceDataset::builtin(),
            };

            let demographics = match (age, gender) {
                (Some(age), Some(g)) => Some(Demographics::new(age, g.parse::<Gender>()?)),
                (Some(age), None) => Some(Demographics::new(age, Gender::Other)),
                (None, Some(_)) => return Err("--gender requires --age".into()),
                (None, None) => None,
            };
            let calibration = CalibrationOffset {
                glucose: reference_glucose,
                viscosity: reference_viscosity,
                blood_pressure: reference_bp
                    .as_deref()
                    .map(CalibrationOffset::parse_blood_pressure)
                    .transpose()?,
            };
            let calibration = (!calibration.is_empty()).then_some(calibration);

            let samples = read_samples(&input)?;
            log::info!("read {} samples from {}", samples.len(), input.display());

            let pipeline = VitalsPipeline::with_config(&config, dataset);
            let estimate = match pipeline.analyze_detailed(
                &samples,
                demographics.as_ref(),
                calibration.as_ref(),
            ) {
                Ok(report) => {
                    if detailed {
                        let detail = serde_json::json!({
                            "features": report.features,
                            "heart_rate": report.heart_rate,
                            "quality": report.quality,
                            "matches": report.matches,
                            "peaks": report.peaks.len(),
                        });
                        println!("{}", serde_json::to_string_pretty(&detail)?);
                    }
                    report.estimate
                }
                Err(e) => {
                    log::warn!("{}; reporting population defaults", e);
                    pipeline.degraded(&e)
                }
            };
            println!("{}", serde_json::to_string_pretty(&estimate)?);

            if let Some(path) = history {
                let mut entries = VitalsHistory::new();
                entries.push(estimate, Utc::now());
                entries.append_csv(&path)?;
                log::info!("appended estimate to {}", path.display());
            }
        }
        Commands::Synth {
            bpm,
            seconds,
            fps,
            noise,
            seed,
            output,
        } => {
            let samples = synthesize(bpm, seconds, fps, noise, seed);
            write_samples(&output, &samples)?;
            println!("wrote {} samples to {}", samples.len(), output.display());
        }
        Commands::Peripheral { payload } => {
            let reading = PeripheralReading::parse(&payload)?;
            println!("{}", serde_json::to_string(&reading)?);
        }
    }
    Ok(())
}

/// Read a CSV with a `red` column and optional `green`/`blue` columns.
fn read_samples(path: &Path) -> Result<Vec<Sample>, Box<dyn std::error::Error>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let red = column("red").ok_or("input CSV needs a 'red' column")?;
    let green = column("green");
    let blue = column("blue");

    let mut samples = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |idx: Option<usize>| -> Result<f64, Box<dyn std::error::Error>> {
            match idx.and_then(|i| record.get(i)) {
                Some(v) => Ok(v
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("row {}: {}", line + 2, e))?),
                None => Ok(0.0),
            }
        };
        samples.push(Sample::new(field(Some(red))?, field(green)?, field(blue)?));
    }
    Ok(samples)
}

fn write_samples(path: &Path, samples: &[Sample]) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["red", "green", "blue"])?;
    for s in samples {
        wtr.write_record([
            format!("{:.4}", s.red),
            format!("{:.4}", s.green),
            format!("{:.4}", s.blue),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Pulse with a small second harmonic on a bright red DC level.
fn synthesize(bpm: f64, seconds: f64, fps: f64, noise: f64, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = (seconds * fps).round().max(0.0) as usize;
    let f = bpm / 60.0;
    let noise = noise.abs();
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * f * i as f64 / fps;
            let pulse = phase.sin() + 0.2 * (2.0 * phase + 0.5).sin();
            let mut n = || if noise > 0.0 { rng.gen_range(-noise..noise) } else { 0.0 };
            Sample::new(
                185.0 + 2.5 * pulse + n(),
                62.0 + 0.8 * pulse + n(),
                46.0 + 1.0 * pulse + n(),
            )
        })
        .collect()
}

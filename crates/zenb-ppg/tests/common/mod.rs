//! Seeded synthetic fingertip recordings shared by the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use zenb_ppg::Sample;

/// Parameters of a synthetic pulse recording.
#[derive(Debug, Clone, Copy)]
pub struct Synth {
    pub bpm: f64,
    pub fps: f64,
    pub seconds: f64,
    /// Pulsatile red amplitude (intensity units)
    pub amplitude: f64,
    /// Red DC level
    pub offset: f64,
    /// Uniform noise half-width
    pub noise: f64,
    pub seed: u64,
}

impl Default for Synth {
    fn default() -> Self {
        Self {
            bpm: 72.0,
            fps: 30.0,
            seconds: 15.0,
            amplitude: 2.5,
            offset: 180.0,
            noise: 0.2,
            seed: 42,
        }
    }
}

impl Synth {
    pub fn samples(&self) -> Vec<Sample> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = (self.fps * self.seconds).round() as usize;
        let f = self.bpm / 60.0;
        (0..n)
            .map(|i| {
                let t = i as f64 / self.fps;
                let phase = 2.0 * PI * f * t;
                let pulse = phase.sin() + 0.2 * (2.0 * phase + 0.5).sin();
                let mut jitter = || {
                    if self.noise > 0.0 {
                        rng.gen_range(-self.noise..self.noise)
                    } else {
                        0.0
                    }
                };
                Sample::new(
                    self.offset + self.amplitude * pulse + jitter(),
                    0.35 * self.offset + 0.3 * self.amplitude * pulse + jitter(),
                    0.25 * self.offset + 0.4 * self.amplitude * pulse + jitter(),
                )
            })
            .collect()
    }
}

/// Uniform noise around a DC level with no periodic component.
pub fn noise_samples(n: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Sample::new(
                180.0 + rng.gen_range(-3.0..3.0),
                60.0 + rng.gen_range(-1.0..1.0),
                45.0 + rng.gen_range(-1.0..1.0),
            )
        })
        .collect()
}

/// Solid RGBA frame with the given red level.
pub fn solid_frame(width: u32, height: u32, red: u8) -> Vec<u8> {
    [red, 30, 25, 255]
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect()
}

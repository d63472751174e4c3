//! Spectral analysis: FFT, power spectral density, Welch averaging.
//!
//! Transforms zero-pad to the next power of two. rustfft does the
//! butterflies; the padding and bin bookkeeping follow the radix-2
//! Cooley-Tukey conventions so bin `k` maps to `k * fs / N`.

use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Real/imaginary parts of a transform of padded length.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub re: Vec<f64>,
    pub im: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }
}

/// One-sided power spectrum, bins `0..=N/2`.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
}

impl PowerSpectrum {
    fn empty() -> Self {
        Self { frequencies: Vec::new(), power: Vec::new() }
    }

    /// `(frequency, power)` pairs falling inside `[lo, hi]`
    pub fn band(&self, lo: f64, hi: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.power.iter().copied())
            .filter(move |(f, _)| *f >= lo && *f <= hi)
    }
}

pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Hann window coefficients
pub fn hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (size - 1) as f64).cos())
        .collect()
}

/// Hamming window coefficients
pub fn hamming_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (size - 1) as f64).cos())
        .collect()
}

/// Forward FFT, zero-padded to the next power of two.
pub fn fft(signal: &[f64]) -> Spectrum {
    if signal.is_empty() {
        return Spectrum { re: Vec::new(), im: Vec::new() };
    }
    let n = next_power_of_two(signal.len());
    let mut buffer: Vec<Complex64> = signal.iter().map(|&s| Complex64::new(s, 0.0)).collect();
    buffer.resize(n, Complex64::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    Spectrum {
        re: buffer.iter().map(|c| c.re).collect(),
        im: buffer.iter().map(|c| c.im).collect(),
    }
}

/// Inverse FFT, scaled by 1/N, returning the real part. The output has
/// the (padded) spectrum length.
pub fn ifft(spectrum: &Spectrum) -> Vec<f64> {
    let n = spectrum.re.len().min(spectrum.im.len());
    if n == 0 {
        return Vec::new();
    }
    let padded = next_power_of_two(n);
    let mut buffer: Vec<Complex64> = spectrum
        .re
        .iter()
        .zip(&spectrum.im)
        .map(|(&re, &im)| Complex64::new(re, im))
        .collect();
    buffer.resize(padded, Complex64::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_inverse(padded).process(&mut buffer);

    let scale = 1.0 / padded as f64;
    buffer.iter().map(|c| c.re * scale).collect()
}

/// Power spectral density `|X_k|^2 / N` at `k * fs / N`.
pub fn power_spectral_density(signal: &[f64], sample_rate: f64) -> PowerSpectrum {
    if signal.is_empty() || sample_rate <= 0.0 {
        return PowerSpectrum::empty();
    }
    let spectrum = fft(signal);
    let n = spectrum.len();
    let half = n / 2;
    let frequencies = (0..=half).map(|k| k as f64 * sample_rate / n as f64).collect();
    let power = (0..=half)
        .map(|k| (spectrum.re[k].powi(2) + spectrum.im[k].powi(2)) / n as f64)
        .collect();
    PowerSpectrum { frequencies, power }
}

/// Frequency of the strongest non-DC bin; 0 when nothing but DC exists.
pub fn dominant_frequency(signal: &[f64], sample_rate: f64) -> f64 {
    let psd = power_spectral_density(signal, sample_rate);
    dominant_in(&psd, f64::MIN_POSITIVE, f64::INFINITY)
}

/// Frequency of the strongest bin within `[lo, hi]`, skipping DC.
pub fn dominant_in(psd: &PowerSpectrum, lo: f64, hi: f64) -> f64 {
    psd.band(lo.max(f64::MIN_POSITIVE), hi)
        .filter(|(f, _)| *f > 0.0)
        .fold((0.0, f64::NEG_INFINITY), |best, (f, p)| if p > best.1 { (f, p) } else { best })
        .0
}

/// Welch's method: Hann-windowed segments of `segment_len` with `overlap`
/// samples shared between neighbours; per-segment PSDs are averaged.
/// Signals shorter than one segment use a single segment of their own length.
pub fn welch(signal: &[f64], sample_rate: f64, segment_len: usize, overlap: usize) -> PowerSpectrum {
    if signal.is_empty() || sample_rate <= 0.0 {
        return PowerSpectrum::empty();
    }
    let seg = segment_len.clamp(2, signal.len().max(2)).min(signal.len());
    let step = seg.saturating_sub(overlap).max(1);
    let window = hann_window(seg);

    let mut acc: Option<PowerSpectrum> = None;
    let mut count = 0usize;
    let mut start = 0;
    while start + seg <= signal.len() {
        let windowed: Vec<f64> = signal[start..start + seg]
            .iter()
            .zip(&window)
            .map(|(s, w)| s * w)
            .collect();
        let psd = power_spectral_density(&windowed, sample_rate);
        acc = Some(match acc {
            None => psd,
            Some(mut total) => {
                for (t, p) in total.power.iter_mut().zip(&psd.power) {
                    *t += p;
                }
                total
            }
        });
        count += 1;
        start += step;
    }

    match acc {
        Some(mut total) => {
            for p in total.power.iter_mut() {
                *p /= count as f64;
            }
            total
        }
        None => PowerSpectrum::empty(),
    }
}

/// Power-weighted mean frequency within `[lo, hi]`; 0 for an empty band.
pub fn spectral_centroid(psd: &PowerSpectrum, lo: f64, hi: f64) -> f64 {
    let (weighted, total) = psd
        .band(lo, hi)
        .fold((0.0, 0.0), |(w, t), (f, p)| (w + f * p, t + p));
    if total <= f64::EPSILON {
        0.0
    } else {
        weighted / total
    }
}

/// Shannon entropy of the normalized power distribution within
/// `[lo, hi]`, scaled to [0, 1] by the log of the bin count.
pub fn spectral_entropy(psd: &PowerSpectrum, lo: f64, hi: f64) -> f64 {
    let band: Vec<f64> = psd.band(lo, hi).map(|(_, p)| p).collect();
    let total: f64 = band.iter().sum();
    if band.len() < 2 || total <= f64::EPSILON {
        return 0.0;
    }
    let h: f64 = band
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| {
            let q = p / total;
            -q * q.ln()
        })
        .sum();
    (h / (band.len() as f64).ln()).clamp(0.0, 1.0)
}

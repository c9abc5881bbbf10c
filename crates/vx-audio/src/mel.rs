//! Mel filterbank and MFCC summary statistics.

use crate::error::FeatureError;
use crate::fft::Spectrogram;
use crate::spectral::power_to_db;
use crate::stats::mean_std;

/// Number of mel bands before the cepstral transform.
pub const N_MELS: usize = 128;
/// Dynamic range kept below the loudest mel cell, in dB.
const TOP_DB: f32 = 80.0;

// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn logstep() -> f32 {
    6.4f32.ln() / 27.0
}

/// Hz to mel (Slaney).
#[must_use]
pub fn hz_to_mel(hz: f32) -> f32 {
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep()
    }
}

/// Mel (Slaney) to Hz.
#[must_use]
pub fn mel_to_hz(mel: f32) -> f32 {
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * (logstep() * (mel - MIN_LOG_MEL)).exp()
    }
}

/// Triangular mel filterbank with area normalisation.
///
/// `weights[m][k]` is the weight of FFT bin `k` in band `m`.
#[derive(Clone, Debug)]
pub struct MelFilterbank {
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build `n_mels` filters spanning 0 Hz to Nyquist for an `n_fft`-point spectrum.
    #[must_use]
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let n_bins = n_fft / 2 + 1;
        let nyquist = sample_rate as f32 / 2.0;
        let bin_hz: Vec<f32> = (0..n_bins)
            .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
            .collect();

        let max_mel = hz_to_mel(nyquist);
        let edges: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f32 / (n_mels + 1) as f32))
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (lo, mid, hi) = (edges[m], edges[m + 1], edges[m + 2]);
                let enorm = 2.0 / (hi - lo);
                bin_hz
                    .iter()
                    .map(|&f| {
                        let lower = (f - lo) / (mid - lo);
                        let upper = (hi - f) / (hi - mid);
                        lower.min(upper).max(0.0) * enorm
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    #[must_use]
    pub fn n_mels(&self) -> usize {
        self.weights.len()
    }

    /// Project a power spectrum onto the mel bands.
    #[must_use]
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|w| w.iter().zip(power).map(|(a, b)| a * b).sum())
            .collect()
    }
}

/// Orthonormal DCT-II of `input`, first `n_out` coefficients.
#[must_use]
pub fn dct_ortho(input: &[f32], n_out: usize) -> Vec<f32> {
    let n = input.len() as f32;
    (0..n_out)
        .map(|k| {
            let sum: f32 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f32::consts::PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n)).cos()
                })
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}

/// Mel power spectrum in dB per frame, clipped to `TOP_DB` below the loudest cell.
#[must_use]
pub fn mel_db_frames(spec: &Spectrogram, bank: &MelFilterbank) -> Vec<Vec<f32>> {
    let mut mel_db: Vec<Vec<f32>> = spec
        .frames
        .iter()
        .map(|frame| {
            let power: Vec<f32> = frame.iter().map(|m| m * m).collect();
            bank.apply(&power).into_iter().map(power_to_db).collect()
        })
        .collect();

    let peak = mel_db
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    for b in mel_db.iter_mut().flatten() {
        *b = b.max(floor);
    }
    mel_db
}

/// Mean and std of each MFCC over frames, interleaved `[m0, s0, m1, s1, ...]`.
///
/// `mel_db` comes from [`mel_db_frames`].
///
/// # Errors
/// Fails when there are no frames or a statistic is not finite.
pub fn mfcc_stats(mel_db: &[Vec<f32>], n_mfcc: usize) -> Result<Vec<f32>, FeatureError> {
    if mel_db.is_empty() {
        return Err(FeatureError::TooShort { needed: 1, got: 0 });
    }
    let frames: Vec<Vec<f32>> = mel_db.iter().map(|bands| dct_ortho(bands, n_mfcc)).collect();
    let mut out = Vec::with_capacity(2 * n_mfcc);
    let mut column = Vec::with_capacity(frames.len());
    for c in 0..n_mfcc {
        column.clear();
        column.extend(frames.iter().map(|f| f[c]));
        let (mean, std) = mean_std(&column)?;
        out.push(mean);
        out.push(std);
    }
    Ok(out)
}

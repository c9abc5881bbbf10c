//! Frame-wise time-domain and spectral descriptors.

use crate::error::FeatureError;
use crate::fft::{Spectrogram, centered_frame, frame_count};
use crate::stats::mean_std;

/// Share of spectral energy below the rolloff frequency.
const ROLLOFF_PERCENT: f32 = 0.85;
/// Lowest contrast band edge; bands double from here.
const CONTRAST_FMIN: f32 = 200.0;
const CONTRAST_BANDS: usize = 6;
/// Fraction of each band's bins averaged for its peak and valley.
const CONTRAST_QUANTILE: f32 = 0.02;
const AMIN: f32 = 1e-10;

fn require_frames(n: usize) -> Result<(), FeatureError> {
    if n == 0 {
        return Err(FeatureError::TooShort { needed: 1, got: 0 });
    }
    Ok(())
}

/// Root-mean-square amplitude per centred frame.
#[must_use]
pub fn rms_frames(samples: &[f32], frame_len: usize, hop: usize) -> Vec<f32> {
    (0..frame_count(samples.len(), hop))
        .map(|t| {
            let frame = centered_frame(samples, t, frame_len, hop);
            (frame.iter().map(|s| s * s).sum::<f32>() / frame_len as f32).sqrt()
        })
        .collect()
}

/// Fraction of adjacent sample pairs that change sign, per centred frame.
#[must_use]
pub fn zcr_frames(samples: &[f32], frame_len: usize, hop: usize) -> Vec<f32> {
    (0..frame_count(samples.len(), hop))
        .map(|t| {
            let frame = centered_frame(samples, t, frame_len, hop);
            let crossings = frame
                .windows(2)
                .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                .count();
            crossings as f32 / frame_len as f32
        })
        .collect()
}

/// RMS energy mean and standard deviation.
///
/// # Errors
/// Fails on an empty signal or non-finite statistics.
pub fn energy_stats(samples: &[f32], frame_len: usize, hop: usize) -> Result<(f32, f32), FeatureError> {
    let frames = rms_frames(samples, frame_len, hop);
    require_frames(frames.len())?;
    mean_std(&frames)
}

/// Zero-crossing-rate mean and standard deviation.
///
/// # Errors
/// Fails on an empty signal or non-finite statistics.
pub fn zcr_stats(samples: &[f32], frame_len: usize, hop: usize) -> Result<(f32, f32), FeatureError> {
    let frames = zcr_frames(samples, frame_len, hop);
    require_frames(frames.len())?;
    mean_std(&frames)
}

/// Spectral centroid mean, centroid std, and rolloff mean, in Hz.
///
/// Silent frames contribute a centroid and rolloff of 0 Hz.
///
/// # Errors
/// Fails when the spectrogram has no frames or the result is not finite.
pub fn centroid_rolloff(spec: &Spectrogram) -> Result<(f32, f32, f32), FeatureError> {
    require_frames(spec.n_frames())?;

    let mut centroids = Vec::with_capacity(spec.n_frames());
    let mut rolloffs = Vec::with_capacity(spec.n_frames());

    for frame in &spec.frames {
        let total: f32 = frame.iter().sum();
        if total <= AMIN {
            centroids.push(0.0);
            rolloffs.push(0.0);
            continue;
        }

        let weighted: f32 = frame
            .iter()
            .enumerate()
            .map(|(k, &mag)| spec.bin_hz(k) * mag)
            .sum();
        centroids.push(weighted / total);

        let threshold = ROLLOFF_PERCENT * total;
        let mut cumulative = 0.0f32;
        let mut rolloff_bin = frame.len() - 1;
        for (k, &mag) in frame.iter().enumerate() {
            cumulative += mag;
            if cumulative >= threshold {
                rolloff_bin = k;
                break;
            }
        }
        rolloffs.push(spec.bin_hz(rolloff_bin));
    }

    let (c_mean, c_std) = mean_std(&centroids)?;
    let (r_mean, _) = mean_std(&rolloffs)?;
    Ok((c_mean, c_std, r_mean))
}

/// Octave sub-band edges in Hz: `[0, fmin, 2 fmin, ...]` capped at Nyquist.
fn contrast_edges(nyquist: f32) -> Vec<f32> {
    let mut edges = vec![0.0];
    let mut f = CONTRAST_FMIN;
    for _ in 0..CONTRAST_BANDS {
        edges.push(f.min(nyquist));
        f *= 2.0;
    }
    edges.push(nyquist);
    edges
}

/// Spectral contrast (peak minus valley, dB) mean and std over all bands and frames.
///
/// # Errors
/// Fails when the spectrogram has no frames or no band contains bins.
pub fn contrast_stats(spec: &Spectrogram) -> Result<(f32, f32), FeatureError> {
    require_frames(spec.n_frames())?;

    let nyquist = spec.sample_rate as f32 / 2.0;
    let edges = contrast_edges(nyquist);
    let bands: Vec<(usize, usize)> = edges
        .windows(2)
        .filter_map(|w| {
            let lo = (0..spec.n_bins()).find(|&k| spec.bin_hz(k) >= w[0])?;
            let hi = (0..spec.n_bins())
                .rev()
                .find(|&k| spec.bin_hz(k) <= w[1])?;
            (hi > lo).then_some((lo, hi + 1))
        })
        .collect();
    if bands.is_empty() {
        return Err(FeatureError::Degenerate("no contrast bands"));
    }

    let mut values = Vec::with_capacity(bands.len() * spec.n_frames());
    let mut sorted = Vec::new();
    for frame in &spec.frames {
        for &(lo, hi) in &bands {
            sorted.clear();
            sorted.extend_from_slice(&frame[lo..hi]);
            sorted.sort_by(f32::total_cmp);
            let idx = ((CONTRAST_QUANTILE * sorted.len() as f32).round() as usize).max(1);
            let valley = sorted[..idx].iter().sum::<f32>() / idx as f32;
            let peak = sorted[sorted.len() - idx..].iter().sum::<f32>() / idx as f32;
            values.push(power_to_db(peak) - power_to_db(valley));
        }
    }
    mean_std(&values)
}

/// Chroma energy mean and std: 12 pitch classes per frame, each frame
/// normalised by its maximum.
///
/// # Errors
/// Fails when the spectrogram has no frames.
pub fn chroma_stats(spec: &Spectrogram) -> Result<(f32, f32), FeatureError> {
    require_frames(spec.n_frames())?;

    // Pitch class of each bin; bins below the audible floor are skipped.
    let classes: Vec<Option<usize>> = (0..spec.n_bins())
        .map(|k| {
            let f = spec.bin_hz(k);
            if f < 20.0 {
                return None;
            }
            // MIDI note number, C = 0
            let midi = 69.0 + 12.0 * (f / 440.0).log2();
            Some((midi.round() as i64).rem_euclid(12) as usize)
        })
        .collect();

    let mut values = Vec::with_capacity(12 * spec.n_frames());
    for frame in &spec.frames {
        let mut chroma = [0.0f32; 12];
        for (k, &mag) in frame.iter().enumerate() {
            if let Some(c) = classes[k] {
                chroma[c] += mag * mag;
            }
        }
        let max = chroma.iter().copied().fold(0.0f32, f32::max);
        if max > AMIN {
            for c in &mut chroma {
                *c /= max;
            }
        }
        values.extend_from_slice(&chroma);
    }
    mean_std(&values)
}

/// `10 * log10(max(x, AMIN))`.
#[inline]
#[must_use]
pub fn power_to_db(x: f32) -> f32 {
    10.0 * x.max(AMIN).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 16_000.0).sin() * amp)
            .collect()
    }

    #[test]
    fn rms_of_sine_is_amplitude_over_root_two() {
        let samples = tone(440.0, 16_000, 0.5);
        let (mean, _) = energy_stats(&samples, 2048, 512).expect("energy");
        // edge frames are half padded, pulling the mean slightly down
        assert!((mean - 0.5 / 2f32.sqrt()).abs() < 0.03, "mean {mean}");
    }

    #[test]
    fn zcr_tracks_frequency() {
        let low = zcr_stats(&tone(100.0, 16_000, 0.5), 2048, 512).expect("zcr").0;
        let high = zcr_stats(&tone(2000.0, 16_000, 0.5), 2048, 512).expect("zcr").0;
        assert!(high > low * 10.0, "low {low} high {high}");
    }

    #[test]
    fn centroid_follows_tone() {
        let spec = Spectrogram::compute(&tone(1000.0, 16_000, 0.5), 16_000, 2048, 512);
        let (c_mean, _, rolloff) = centroid_rolloff(&spec).expect("centroid");
        assert!((c_mean - 1000.0).abs() < 60.0, "centroid {c_mean}");
        assert!(rolloff >= 990.0 && rolloff < 1100.0, "rolloff {rolloff}");
    }

    #[test]
    fn silence_gives_zero_centroid_and_chroma() {
        let spec = Spectrogram::compute(&[0.0; 8000], 16_000, 2048, 512);
        let (c_mean, c_std, _) = centroid_rolloff(&spec).expect("centroid");
        assert!(c_mean.abs() < f32::EPSILON && c_std.abs() < f32::EPSILON);
        let (chroma_mean, _) = chroma_stats(&spec).expect("chroma");
        assert!(chroma_mean.abs() < f32::EPSILON);
    }

    #[test]
    fn pure_tone_has_high_contrast() {
        let spec = Spectrogram::compute(&tone(300.0, 16_000, 0.5), 16_000, 2048, 512);
        let (mean, _) = contrast_stats(&spec).expect("contrast");
        assert!(mean > 10.0, "contrast {mean}");
    }

    #[test]
    fn empty_signal_fails_every_group() {
        assert!(energy_stats(&[], 2048, 512).is_err());
        assert!(zcr_stats(&[], 2048, 512).is_err());
        let spec = Spectrogram::compute(&[], 16_000, 2048, 512);
        assert!(centroid_rolloff(&spec).is_err());
        assert!(contrast_stats(&spec).is_err());
        assert!(chroma_stats(&spec).is_err());
    }

    #[test]
    fn contrast_edges_are_octaves() {
        assert_eq!(
            contrast_edges(8000.0),
            vec![0.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 6400.0, 8000.0]
        );
    }
}

use rayon::prelude::*;

use crate::error::FeatureError;
use crate::stats::mean_std;

/// Aperiodicity threshold below which a lag is accepted as the period.
const YIN_THRESHOLD: f32 = 0.15;
/// Frames quieter than this RMS are treated as unvoiced without analysis.
const SILENCE_RMS: f32 = 1e-4;

/// YIN fundamental-frequency tracker restricted to a voice band.
///
/// # Example
/// ```
/// use vx_audio::pitch::PitchTracker;
/// let tracker = PitchTracker::new(16_000, 75.0, 400.0);
/// let tone: Vec<f32> = (0..16_000)
///     .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 16_000.0).sin())
///     .collect();
/// let (mean, _std) = tracker.pitch_stats(&tone).unwrap();
/// assert!((mean - 200.0).abs() < 2.0);
/// ```
#[derive(Clone, Debug)]
pub struct PitchTracker {
    sample_rate: u32,
    min_lag: usize,
    max_lag: usize,
    frame_len: usize,
    hop: usize,
}

impl PitchTracker {
    #[must_use]
    pub fn new(sample_rate: u32, fmin: f32, fmax: f32) -> Self {
        let sr = sample_rate as f32;
        let min_lag = ((sr / fmax).floor() as usize).max(2);
        let max_lag = ((sr / fmin).ceil() as usize).max(min_lag + 1);
        let frame_len = (2 * max_lag + 2).max(1024);
        Self {
            sample_rate,
            min_lag,
            max_lag,
            frame_len,
            hop: frame_len / 4,
        }
    }

    /// Minimum number of samples needed for one analysis frame.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Per-frame f0 estimates; `None` marks unvoiced frames.
    #[must_use]
    pub fn track(&self, samples: &[f32]) -> Vec<Option<f32>> {
        if samples.len() < self.frame_len {
            return Vec::new();
        }
        let n_frames = 1 + (samples.len() - self.frame_len) / self.hop;
        (0..n_frames)
            .into_par_iter()
            .map(|t| {
                let start = t * self.hop;
                self.frame_pitch(&samples[start..start + self.frame_len])
            })
            .collect()
    }

    /// Mean and standard deviation of f0 over voiced frames.
    ///
    /// # Errors
    /// Fails if the signal is shorter than one frame or no frame is voiced.
    pub fn pitch_stats(&self, samples: &[f32]) -> Result<(f32, f32), FeatureError> {
        if samples.len() < self.frame_len {
            return Err(FeatureError::TooShort {
                needed: self.frame_len,
                got: samples.len(),
            });
        }
        let voiced: Vec<f32> = self.track(samples).into_iter().flatten().collect();
        if voiced.is_empty() {
            return Err(FeatureError::Unvoiced);
        }
        mean_std(&voiced)
    }

    fn frame_pitch(&self, frame: &[f32]) -> Option<f32> {
        let energy = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        if energy.sqrt() < SILENCE_RMS {
            return None;
        }

        let window = frame.len() - self.max_lag;

        // Difference function d(tau), tau in 1..=max_lag.
        let mut diff = vec![0.0f32; self.max_lag + 1];
        for (tau, slot) in diff.iter_mut().enumerate().skip(1) {
            *slot = (0..window)
                .map(|j| {
                    let d = frame[j] - frame[j + tau];
                    d * d
                })
                .sum();
        }

        // Cumulative mean normalised difference.
        let mut cmnd = vec![1.0f32; self.max_lag + 1];
        let mut running = 0.0f32;
        for tau in 1..=self.max_lag {
            running += diff[tau];
            cmnd[tau] = if running > 0.0 {
                diff[tau] * tau as f32 / running
            } else {
                1.0
            };
        }

        let mut tau = self.min_lag;
        while tau <= self.max_lag {
            if cmnd[tau] < YIN_THRESHOLD {
                while tau < self.max_lag && cmnd[tau + 1] < cmnd[tau] {
                    tau += 1;
                }
                let refined = parabolic_min(&cmnd, tau);
                let f0 = self.sample_rate as f32 / refined;
                return f0.is_finite().then_some(f0);
            }
            tau += 1;
        }
        None
    }
}

/// Sub-sample position of the minimum around `tau`.
fn parabolic_min(values: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= values.len() {
        return tau as f32;
    }
    let (a, b, c) = (values[tau - 1], values[tau], values[tau + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < f32::EPSILON {
        return tau as f32;
    }
    tau as f32 + 0.5 * (a - c) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, secs: f32, amp: f32) -> Vec<f32> {
        (0..(16_000.0 * secs) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 16_000.0).sin() * amp)
            .collect()
    }

    #[test]
    fn tracks_low_voice() {
        let tracker = PitchTracker::new(16_000, 75.0, 400.0);
        let (mean, std) = tracker.pitch_stats(&tone(110.0, 1.0, 0.5)).expect("voiced");
        assert!((mean - 110.0).abs() < 1.5, "mean {mean}");
        assert!(std < 1.0, "std {std}");
    }

    #[test]
    fn silence_is_unvoiced() {
        let tracker = PitchTracker::new(16_000, 75.0, 400.0);
        assert_eq!(
            tracker.pitch_stats(&vec![0.0; 16_000]),
            Err(FeatureError::Unvoiced)
        );
    }

    #[test]
    fn short_clip_is_too_short() {
        let tracker = PitchTracker::new(16_000, 75.0, 400.0);
        assert!(matches!(
            tracker.pitch_stats(&tone(200.0, 0.01, 0.5)),
            Err(FeatureError::TooShort { .. })
        ));
    }
}

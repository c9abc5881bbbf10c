use std::path::{Path, PathBuf};

/// Mono PCM signal at the canonical analysis rate.
///
/// Produced once per input file and never mutated.
///
/// # Example
/// ```
/// use vx_audio::signal::CanonicalSignal;
/// let signal = CanonicalSignal::new(vec![0.0; 16_000], 16_000);
/// assert!((signal.duration() - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct CanonicalSignal {
    samples: Vec<f32>,
    sample_rate: u32,
    transcoded_path: Option<PathBuf>,
}

impl CanonicalSignal {
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            transcoded_path: None,
        }
    }

    /// Record the intermediate file written by the external transcoder.
    #[must_use]
    pub(crate) fn with_transcoded_path(mut self, path: PathBuf) -> Self {
        self.transcoded_path = Some(path);
        self
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Sibling file written by ffmpeg, if any. Deleting it is the caller's job.
    #[must_use]
    pub fn transcoded_path(&self) -> Option<&Path> {
        self.transcoded_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_has_zero_duration() {
        let signal = CanonicalSignal::new(vec![0.1; 10], 0);
        assert!(signal.duration().abs() < f64::EPSILON);
    }

    #[test]
    fn native_signal_has_no_sibling() {
        let signal = CanonicalSignal::new(vec![], 16_000);
        assert!(signal.transcoded_path().is_none());
    }
}

// Audio normalisation: arbitrary container -> mono PCM at the canonical rate.
//
// Path:
//   - `decode_file` (symphonia) handles everything it can probe natively
//   - anything else is transcoded by an external `ffmpeg` into a sibling
//     `<stem>.vx16k.wav`, which is then decoded natively
//   - `resample_mono` brings native-rate output to the canonical rate

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use vx_core::config::AudioConfig;

use crate::decode::decode_file;
use crate::error::AudioError;
use crate::resample::resample_mono;
use crate::signal::CanonicalSignal;

/// Suffix of the intermediate file written next to an input that needed transcoding.
pub const TRANSCODED_SUFFIX: &str = "vx16k.wav";

/// Turns input files into [`CanonicalSignal`]s.
///
/// # Example
/// ```
/// use vx_audio::normalize::AudioNormalizer;
/// use vx_core::config::AudioConfig;
/// let normalizer = AudioNormalizer::new(&AudioConfig::default());
/// assert_eq!(normalizer.sample_rate(), 16_000);
/// ```
#[derive(Clone, Debug)]
pub struct AudioNormalizer {
    sample_rate: u32,
    ffmpeg_path: PathBuf,
}

impl AudioNormalizer {
    #[must_use]
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            ffmpeg_path: config.ffmpeg_path.clone(),
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decode `path` into a mono signal at the canonical rate.
    ///
    /// Falls back to ffmpeg when symphonia cannot decode the input. The
    /// transcoded sibling file is left on disk and reported through
    /// [`CanonicalSignal::transcoded_path`].
    ///
    /// # Errors
    /// Returns [`AudioError::Decode`] if neither path yields samples. Not retried.
    pub fn normalize(&self, path: &Path) -> Result<CanonicalSignal, AudioError> {
        if !path.is_file() {
            return Err(AudioError::decode(path, "file not found"));
        }

        match decode_file(path) {
            Ok((samples, rate)) => self.to_canonical(path, &samples, rate),
            Err(native_err) => {
                log::info!(
                    "Native decode failed for {} ({native_err}), trying ffmpeg",
                    path.display()
                );
                let sibling = self.transcode(path)?;
                let (samples, rate) = decode_file(&sibling)?;
                Ok(self
                    .to_canonical(path, &samples, rate)?
                    .with_transcoded_path(sibling))
            }
        }
    }

    fn to_canonical(
        &self,
        path: &Path,
        samples: &[f32],
        rate: u32,
    ) -> Result<CanonicalSignal, AudioError> {
        let samples = resample_mono(samples, rate, self.sample_rate)
            .map_err(|e| AudioError::decode(path, e))?;
        Ok(CanonicalSignal::new(samples, self.sample_rate))
    }

    /// Re-encode `input` to mono 16-bit PCM WAV at the canonical rate, next to the input.
    fn transcode(&self, input: &Path) -> Result<PathBuf, AudioError> {
        let sibling = transcoded_sibling(input);
        let rate = self.sample_rate.to_string();

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar", &rate, "-c:a", "pcm_s16le"])
            .arg(&sibling)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                let unavailable =
                    AudioError::FfmpegUnavailable(format!("{}: {e}", self.ffmpeg_path.display()));
                AudioError::decode(input, unavailable)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            log::warn!("ffmpeg failed on {}: {stderr}", input.display());
            return Err(AudioError::decode(
                input,
                format!("ffmpeg exit_code={:?} stderr={stderr}", output.status.code()),
            ));
        }

        log::debug!("Transcoded {} -> {}", input.display(), sibling.display());
        Ok(sibling)
    }
}

/// Path of the intermediate file ffmpeg writes for `input`.
///
/// # Example
/// ```
/// use std::path::Path;
/// use vx_audio::normalize::transcoded_sibling;
/// let p = transcoded_sibling(Path::new("/tmp/voice.webm"));
/// assert_eq!(p, Path::new("/tmp/voice.vx16k.wav"));
/// ```
#[must_use]
pub fn transcoded_sibling(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "audio".into(), |s| s.to_string_lossy());
    input.with_file_name(format!("{stem}.{TRANSCODED_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sine(path: &Path, rate: u32, secs: f32, freq: f32, amp: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        let n = (rate as f32 * secs) as usize;
        for i in 0..n {
            let s = (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * amp;
            writer
                .write_sample((s * f32::from(i16::MAX)) as i16)
                .expect("write");
        }
        writer.finalize().expect("finalize");
    }

    #[test]
    fn native_wav_is_resampled_to_canonical_rate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.wav");
        write_sine(&path, 22_050, 1.0, 200.0, 0.3);

        let signal = AudioNormalizer::new(&AudioConfig::default())
            .normalize(&path)
            .expect("normalize");
        assert_eq!(signal.sample_rate(), 16_000);
        assert!((signal.duration() - 1.0).abs() < 0.01);
        assert!(signal.transcoded_path().is_none());
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = AudioNormalizer::new(&AudioConfig::default())
            .normalize(Path::new("/no/such/clip.wav"))
            .expect_err("should fail");
        assert!(matches!(err, AudioError::Decode { .. }));
    }

    #[test]
    fn undecodable_input_without_ffmpeg_is_decode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.webm");
        std::fs::write(&path, b"not a real webm container").expect("write");

        let config = AudioConfig {
            ffmpeg_path: dir.path().join("no-ffmpeg-here"),
            ..AudioConfig::default()
        };
        let err = AudioNormalizer::new(&config).normalize(&path).expect_err("should fail");
        match err {
            AudioError::Decode { reason, .. } => assert!(reason.contains("ffmpeg unavailable")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sibling_keeps_directory() {
        let p = transcoded_sibling(Path::new("uploads/abc.m4a"));
        assert_eq!(p, Path::new("uploads/abc.vx16k.wav"));
    }
}

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::AudioError;

const CHUNK_SIZE: usize = 1024;

/// Resample a mono buffer from `source_rate` to `target_rate`.
///
/// Windowed-sinc interpolation; the resampler's group delay is trimmed so the
/// output stays aligned with the input.
///
/// # Errors
/// Returns [`AudioError::Resample`] if either rate is zero or rubato rejects the input.
///
/// # Example
/// ```
/// use vx_audio::resample::resample_mono;
/// let same = resample_mono(&[0.1, 0.2], 16_000, 16_000).unwrap();
/// assert_eq!(same, vec![0.1, 0.2]);
/// ```
pub fn resample_mono(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, AudioError> {
    if source_rate == 0 || target_rate == 0 {
        return Err(AudioError::Resample(format!(
            "invalid rates {source_rate} -> {target_rate}"
        )));
    }
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| AudioError::Resample(format!("cannot create resampler: {e}")))?;

    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay);

    let mut chunks = samples.chunks(CHUNK_SIZE).peekable();
    while let Some(chunk) = chunks.next() {
        let input = [chunk];
        let produced = if chunks.peek().is_none() {
            resampler.process_partial(Some(&input[..]), None)
        } else {
            resampler.process(&input, None)
        }
        .map_err(|e| AudioError::Resample(e.to_string()))?;

        if let Some(channel) = produced.first() {
            output.extend_from_slice(channel);
        }
    }

    // Flush the tail held back by the filter delay.
    while output.len() < expected_len + delay {
        let produced = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        match produced.first() {
            Some(channel) if !channel.is_empty() => output.extend_from_slice(channel),
            _ => break,
        }
    }

    let start = delay.min(output.len());
    let end = (start + expected_len).min(output.len());
    Ok(output[start..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsample_keeps_duration() {
        let input: Vec<f32> = (0..44_100)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 44_100.0).sin() * 0.5)
            .collect();
        let out = resample_mono(&input, 44_100, 16_000).expect("resample");
        assert!((out.len() as i64 - 16_000).abs() <= 2, "got {}", out.len());
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.4 && peak < 0.6, "peak {peak}");
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(matches!(
            resample_mono(&[0.0], 0, 16_000),
            Err(AudioError::Resample(_))
        ));
    }
}

use crate::error::FeatureError;

/// Tempo search range in BPM.
const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;
/// Centre of the log-normal tempo prior.
const PRIOR_BPM: f32 = 120.0;
/// Prior width in octaves.
const PRIOR_OCTAVES: f32 = 1.0;

/// Onset strength per frame: rectified spectral flux of the mel dB spectrum,
/// averaged over bands. The first frame has no predecessor and scores 0.
#[must_use]
pub fn onset_envelope(mel_db: &[Vec<f32>]) -> Vec<f32> {
    let mut envelope = Vec::with_capacity(mel_db.len());
    if let Some(first) = mel_db.first() {
        envelope.push(0.0);
        let mut prev = first;
        for frame in &mel_db[1..] {
            let flux: f32 = frame
                .iter()
                .zip(prev)
                .map(|(&cur, &p)| (cur - p).max(0.0))
                .sum();
            envelope.push(flux / frame.len().max(1) as f32);
            prev = frame;
        }
    }
    envelope
}

/// Global tempo estimate in BPM.
///
/// Autocorrelates the mean-removed onset envelope over lags spanning
/// 30-300 BPM and picks the lag with the strongest prior-weighted
/// correlation.
///
/// # Errors
/// Fails if the envelope is too short for the slowest usable lag, carries
/// no onsets, or shows no positive periodicity.
pub fn estimate_tempo(envelope: &[f32], frame_rate: f32) -> Result<f32, FeatureError> {
    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = (60.0 * frame_rate / MIN_BPM).ceil() as usize;
    if envelope.len() <= min_lag + 1 {
        return Err(FeatureError::TooShort {
            needed: min_lag + 2,
            got: envelope.len(),
        });
    }
    let max_lag = max_lag.min(envelope.len() - 1);

    let n = envelope.len() as f32;
    let mean = envelope.iter().sum::<f32>() / n;
    let centred: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
    let energy: f32 = centred.iter().map(|v| v * v).sum();
    if energy < 1e-9 {
        return Err(FeatureError::Degenerate("flat onset envelope"));
    }

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let overlap = centred.len() - lag;
        let ac: f32 = centred[..overlap]
            .iter()
            .zip(&centred[lag..])
            .map(|(a, b)| a * b)
            .sum::<f32>()
            / overlap as f32;
        let score = ac * prior_weight(60.0 * frame_rate / lag as f32);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    match best {
        Some((lag, score)) if score > 0.0 => {
            let bpm = 60.0 * frame_rate / lag as f32;
            if bpm.is_finite() {
                Ok(bpm)
            } else {
                Err(FeatureError::NonFinite("tempo"))
            }
        }
        _ => Err(FeatureError::Degenerate("no periodic onsets")),
    }
}

/// Log-normal weight centred on [`PRIOR_BPM`].
fn prior_weight(bpm: f32) -> f32 {
    let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use vx_core::emotion::{Emotion, EmotionDistribution};
use vx_core::features::FeatureVector;
use vx_emotion::EmotionService;

/// Serialisable echo of a recorded sample.
#[derive(Serialize)]
struct Recorded {
    total_samples: u64,
}

/// `analyze`: returns the JSON to print.
pub fn analyze(
    service: &EmotionService,
    file: &Path,
    duration: Option<f64>,
    record: bool,
) -> Result<String> {
    let result = service
        .analyze(file, duration)
        .with_context(|| format!("Cannot analyse {}", file.display()))?;

    if record {
        let total = service
            .record_sample(
                result.feature_vector.clone(),
                result.emotions.clone(),
                result.duration,
            )
            .context("Cannot record analysed sample")?;
        log::info!("Recorded sample #{total}");
    }

    Ok(serde_json::to_string_pretty(&result)?)
}

/// `record`: parse the JSON arguments and append one sample.
pub fn record(
    service: &EmotionService,
    features: &str,
    emotions: &str,
    duration: f64,
) -> Result<String> {
    let features = parse_features(features)?;
    let emotions = parse_emotions(emotions)?;
    let total_samples = service
        .record_sample(features, emotions, duration)
        .context("Cannot record sample")?;
    Ok(serde_json::to_string_pretty(&Recorded { total_samples })?)
}

pub fn stats(service: &EmotionService) -> Result<String> {
    Ok(serde_json::to_string_pretty(&service.training_stats())?)
}

pub fn retrain(service: &EmotionService) -> Result<String> {
    Ok(serde_json::to_string_pretty(&service.retrain())?)
}

fn parse_features(json: &str) -> Result<FeatureVector> {
    serde_json::from_str(json).context("--features must be a JSON array of 42 numbers")
}

/// Accepts `{"label": weight, ...}` and renormalises the weights to 100.
fn parse_emotions(json: &str) -> Result<EmotionDistribution> {
    let weights: BTreeMap<Emotion, f64> =
        serde_json::from_str(json).context("--emotions must map emotion labels to weights")?;
    if weights.is_empty() {
        anyhow::bail!("--emotions needs at least one label");
    }
    let weights: Vec<(Emotion, f64)> = weights.into_iter().collect();
    Ok(EmotionDistribution::from_weights(&weights)?)
}

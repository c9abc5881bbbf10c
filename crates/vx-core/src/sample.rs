use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::{Emotion, EmotionDistribution};
use crate::features::FeatureVector;

/// One recorded observation: the features of an analysed clip and the
/// distribution that was reported for it.
///
/// Appended to the training log and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub emotions: EmotionDistribution,
    /// Clip duration in seconds.
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

impl TrainingSample {
    /// Stamp a new sample with the current time.
    #[must_use]
    pub fn new(features: FeatureVector, emotions: EmotionDistribution, duration: f64) -> Self {
        Self {
            features,
            emotions,
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Training label: the dominant emotion of the stored distribution.
    #[must_use]
    pub fn label(&self) -> Option<Emotion> {
        self.emotions.dominant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_dominant_emotion() {
        let emotions = EmotionDistribution::from_weights(&[
            (Emotion::Anger, 1.0),
            (Emotion::Stress, 4.0),
        ])
        .expect("valid weights");
        let sample = TrainingSample::new(FeatureVector::zeros(), emotions, 3.5);
        assert_eq!(sample.label(), Some(Emotion::Stress));
    }

    #[test]
    fn json_line_round_trip() {
        let emotions =
            EmotionDistribution::from_weights(&[(Emotion::Neutral, 1.0)]).expect("valid weights");
        let sample = TrainingSample::new(FeatureVector::zeros(), emotions, 2.0);
        let line = serde_json::to_string(&sample).expect("serialize");
        assert!(!line.contains('\n'));
        let back: TrainingSample = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(back, sample);
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Closed set of emotion labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happiness,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Neutral,
    Stress,
    Anxiety,
}

impl Emotion {
    /// Every label, in declaration order.
    pub const ALL: [Emotion; 8] = [
        Emotion::Happiness,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Neutral,
        Emotion::Stress,
        Emotion::Anxiety,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happiness => "happiness",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
            Emotion::Stress => "stress",
            Emotion::Anxiety => "anxiety",
        }
    }

    /// Presentation hint (UI contextual colour class) for this label.
    ///
    /// # Example
    /// ```
    /// use vx_core::emotion::Emotion;
    /// assert_eq!(Emotion::Anger.display_hint(), "danger");
    /// ```
    #[must_use]
    pub fn display_hint(self) -> &'static str {
        match self {
            Emotion::Happiness => "success",
            Emotion::Sadness => "info",
            Emotion::Anger => "danger",
            Emotion::Fear => "dark",
            Emotion::Surprise => "warning",
            Emotion::Neutral => "secondary",
            Emotion::Stress => "primary",
            Emotion::Anxiety => "light",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == needle)
            .ok_or_else(|| CoreError::UnknownEmotion(s.to_string()))
    }
}

/// One entry of an [`EmotionDistribution`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub label: Emotion,
    /// Percentage share in [0, 100].
    pub score: f64,
    pub display_hint: String,
}

/// Scores over emotion labels, summing to 100 and sorted descending.
///
/// # Example
/// ```
/// use vx_core::emotion::{Emotion, EmotionDistribution};
/// let d = EmotionDistribution::from_weights(&[(Emotion::Sadness, 3.0), (Emotion::Anger, 1.0)]).unwrap();
/// assert_eq!(d.dominant(), Some(Emotion::Sadness));
/// assert!((d.scores()[0].score - 75.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionDistribution(Vec<EmotionScore>);

/// Allowed drift of the score total away from 100.
pub const SCORE_TOLERANCE: f64 = 1e-3;

impl EmotionDistribution {
    /// Renormalise non-negative weights to percentages and sort descending.
    ///
    /// All-zero weights yield a uniform distribution. Ties keep input order.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidScore`] for a negative or non-finite weight.
    pub fn from_weights(weights: &[(Emotion, f64)]) -> Result<Self, CoreError> {
        if let Some((label, score)) = weights.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(CoreError::InvalidScore {
                label: label.to_string(),
                score: *score,
            });
        }

        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        let uniform = 100.0 / weights.len().max(1) as f64;

        let mut entries: Vec<EmotionScore> = weights
            .iter()
            .map(|&(label, w)| EmotionScore {
                label,
                score: if total > 0.0 { w / total * 100.0 } else { uniform },
                display_hint: label.display_hint().to_string(),
            })
            .collect();

        // Stable sort: equal scores keep the caller's label order.
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(Self(entries))
    }

    /// Equal share for every label in `labels`, in the given order.
    #[must_use]
    pub fn uniform(labels: &[Emotion]) -> Self {
        let share = 100.0 / labels.len().max(1) as f64;
        Self(
            labels
                .iter()
                .map(|&label| EmotionScore {
                    label,
                    score: share,
                    display_hint: label.display_hint().to_string(),
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn scores(&self) -> &[EmotionScore] {
        &self.0
    }

    /// Highest-scored label.
    #[must_use]
    pub fn dominant(&self) -> Option<Emotion> {
        self.0.first().map(|e| e.label)
    }

    /// Score of `label`, or 0 if absent.
    #[must_use]
    pub fn score_of(&self, label: Emotion) -> f64 {
        self.0
            .iter()
            .find(|e| e.label == label)
            .map_or(0.0, |e| e.score)
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.iter().map(|e| e.score).sum()
    }

    /// True if scores sum to 100 within [`SCORE_TOLERANCE`] and are sorted descending.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let sorted = self.0.windows(2).all(|w| w[0].score >= w[1].score);
        let non_negative = self.0.iter().all(|e| e.score >= 0.0);
        sorted && non_negative && (self.total() - 100.0).abs() <= SCORE_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_strings() {
        for e in Emotion::ALL {
            assert_eq!(e.as_str().parse::<Emotion>().expect("parse"), e);
        }
        assert!("joy".parse::<Emotion>().is_err());
        assert_eq!(" Anger ".parse::<Emotion>().expect("parse"), Emotion::Anger);
    }

    #[test]
    fn weights_are_renormalised_and_sorted() {
        let d = EmotionDistribution::from_weights(&[
            (Emotion::Happiness, 0.2),
            (Emotion::Sadness, 0.6),
            (Emotion::Anger, 0.2),
        ])
        .expect("valid weights");
        assert!(d.is_well_formed());
        assert_eq!(d.dominant(), Some(Emotion::Sadness));
        assert!((d.score_of(Emotion::Sadness) - 60.0).abs() < 1e-9);
        // tie keeps input order
        assert_eq!(d.scores()[1].label, Emotion::Happiness);
        assert_eq!(d.scores()[2].label, Emotion::Anger);
    }

    #[test]
    fn zero_weights_become_uniform() {
        let d = EmotionDistribution::from_weights(&[(Emotion::Fear, 0.0), (Emotion::Stress, 0.0)])
            .expect("valid weights");
        assert!(d.is_well_formed());
        assert!((d.score_of(Emotion::Fear) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = EmotionDistribution::from_weights(&[(Emotion::Fear, -1.0)]).expect_err("should fail");
        assert!(matches!(err, CoreError::InvalidScore { .. }));
    }

    #[test]
    fn serializes_as_plain_list() {
        let d = EmotionDistribution::from_weights(&[(Emotion::Surprise, 1.0)]).expect("valid");
        let json = serde_json::to_string(&d).expect("serialize");
        assert_eq!(
            json,
            r#"[{"label":"surprise","score":100.0,"display_hint":"warning"}]"#
        );
    }
}

// Rule-based emotion scoring from prosodic summary features.
//
// Used whenever no trained bundle is available or the bundle fails. Inputs
// are mapped to [0, 1]:
//   p = (pitch_mean - 75) / 325     s = pitch_std / 100
//   e = energy_mean / 0.2           z = zcr_mean / 0.3
// and combined linearly into five emotion weights before renormalisation.

use vx_core::emotion::{Emotion, EmotionDistribution};
use vx_core::features::FeatureSummary;

/// Confidence reported for every heuristic classification.
pub const HEURISTIC_CONFIDENCE: f64 = 0.75;

/// Labels the heuristic can produce, in tie-break order.
pub const HEURISTIC_LABELS: [Emotion; 5] = [
    Emotion::Happiness,
    Emotion::Sadness,
    Emotion::Anger,
    Emotion::Stress,
    Emotion::Anxiety,
];

const PITCH_FLOOR_HZ: f64 = 75.0;
const PITCH_SPAN_HZ: f64 = 400.0 - 75.0;
const PITCH_STD_SCALE: f64 = 100.0;
const ENERGY_SCALE: f64 = 0.2;
const ZCR_SCALE: f64 = 0.3;

/// Clamp to [0, 1]; non-finite input counts as 0.
fn unit(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}

/// Raw, unnormalised weights for [`HEURISTIC_LABELS`].
#[must_use]
pub fn heuristic_weights(summary: &FeatureSummary) -> [(Emotion, f64); 5] {
    let p = unit((f64::from(summary.pitch_mean) - PITCH_FLOOR_HZ) / PITCH_SPAN_HZ);
    let s = unit(f64::from(summary.pitch_std) / PITCH_STD_SCALE);
    let e = unit(f64::from(summary.energy_mean) / ENERGY_SCALE);
    let z = unit(f64::from(summary.zcr_mean) / ZCR_SCALE);

    [
        (Emotion::Happiness, 0.4 * p + 0.4 * e + 0.2 * (1.0 - s)),
        (Emotion::Sadness, 0.4 * (1.0 - p) + 0.4 * (1.0 - e) + 0.2 * (1.0 - s)),
        (Emotion::Anger, 0.4 * s + 0.4 * e + 0.2 * z),
        (Emotion::Stress, 0.4 * z + 0.3 * s + 0.3 * e),
        (Emotion::Anxiety, 0.4 * s + 0.3 * z + 0.3 * (0.5 * e)),
    ]
}

/// Heuristic distribution over [`HEURISTIC_LABELS`], summing to 100.
#[must_use]
pub fn heuristic_distribution(summary: &FeatureSummary) -> EmotionDistribution {
    EmotionDistribution::from_weights(&heuristic_weights(summary))
        .unwrap_or_else(|_| EmotionDistribution::uniform(&HEURISTIC_LABELS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(pitch: f32, pitch_std: f32, energy: f32, zcr: f32) -> FeatureSummary {
        FeatureSummary {
            pitch_mean: pitch,
            pitch_std,
            energy_mean: energy,
            zcr_mean: zcr,
            spectral_centroid_mean: 1500.0,
            tempo: 120.0,
        }
    }

    #[test]
    fn weights_match_formula() {
        // p = 0.5, s = 0.2, e = 0.5, z = 0.5
        let w = heuristic_weights(&summary(237.5, 20.0, 0.1, 0.15));
        let expected = [0.56, 0.56, 0.38, 0.41, 0.305];
        for ((_, got), want) in w.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} vs {want}");
        }
    }

    #[test]
    fn quiet_low_voice_reads_as_sadness() {
        let d = heuristic_distribution(&summary(95.0, 5.0, 0.01, 0.02));
        assert_eq!(d.dominant(), Some(Emotion::Sadness));
        assert!(d.is_well_formed());
    }

    #[test]
    fn loud_variable_voice_reads_as_anger() {
        let d = heuristic_distribution(&summary(260.0, 120.0, 0.4, 0.1));
        assert_eq!(d.dominant(), Some(Emotion::Anger));
    }

    #[test]
    fn inputs_are_clamped() {
        let wild = heuristic_weights(&summary(10_000.0, -50.0, f32::NAN, 99.0));
        let tame = heuristic_weights(&summary(400.0, 0.0, 0.0, 0.3));
        assert_eq!(wild, tame);
    }

    #[test]
    fn only_five_labels() {
        let d = heuristic_distribution(&summary(150.0, 20.0, 0.05, 0.05));
        assert_eq!(d.scores().len(), 5);
        assert_eq!(d.score_of(Emotion::Fear), 0.0);
    }
}

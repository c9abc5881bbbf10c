use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;

use vx_core::emotion::EmotionDistribution;
use vx_core::features::FeatureVector;

use crate::bundle::ModelBundle;
use crate::error::ModelError;
use crate::heuristic::{HEURISTIC_CONFIDENCE, heuristic_distribution};

/// Why the heuristic was used instead of the model.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoModel,
    ModelFailed(String),
}

/// Which scorer produced a classification.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierPath {
    Model,
    Heuristic(FallbackReason),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    pub distribution: EmotionDistribution,
    /// In [0, 1].
    pub confidence: f64,
    pub path: ClassifierPath,
}

/// Model-or-heuristic emotion classifier.
///
/// The active bundle is swapped atomically; each `classify` call loads one
/// `Arc` snapshot and uses it throughout, so a concurrent swap never mixes
/// the scaler of one bundle with the classifier of another.
///
/// # Example
/// ```
/// use vx_core::features::FeatureVector;
/// use vx_emotion::classifier::{ClassifierPath, EmotionClassifier, FallbackReason};
///
/// let classifier = EmotionClassifier::new();
/// let result = classifier.classify(&FeatureVector::zeros());
/// assert_eq!(result.path, ClassifierPath::Heuristic(FallbackReason::NoModel));
/// assert!((result.confidence - 0.75).abs() < f64::EPSILON);
/// ```
#[derive(Default)]
pub struct EmotionClassifier {
    bundle: ArcSwapOption<ModelBundle>,
}

impl EmotionClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bundle(bundle: ModelBundle) -> Self {
        let classifier = Self::new();
        classifier.install(bundle);
        classifier
    }

    /// Replace the active bundle. In-flight classifications keep the old one.
    pub fn install(&self, bundle: ModelBundle) {
        self.bundle.store(Some(Arc::new(bundle)));
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.bundle.load().is_some()
    }

    /// Snapshot of the active bundle.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ModelBundle>> {
        self.bundle.load_full()
    }

    pub fn classify(&self, features: &FeatureVector) -> Classification {
        let Some(bundle) = self.bundle.load_full() else {
            log::debug!("No model bundle, using heuristic");
            return heuristic(features, FallbackReason::NoModel);
        };

        match model_classification(&bundle, features) {
            Ok(classification) => {
                log::debug!(
                    "Model classification: {:?} ({:.3})",
                    classification.distribution.dominant(),
                    classification.confidence
                );
                classification
            }
            Err(e) => {
                log::warn!("Model classification failed, using heuristic: {e}");
                heuristic(features, FallbackReason::ModelFailed(e.to_string()))
            }
        }
    }
}

fn model_classification(
    bundle: &ModelBundle,
    features: &FeatureVector,
) -> Result<Classification, ModelError> {
    let probs = bundle.predict(features)?;
    let confidence = probs
        .iter()
        .map(|&(_, p)| p)
        .fold(0.0f64, f64::max)
        .clamp(0.0, 1.0);
    let weights: Vec<_> = probs.into_iter().map(|(label, p)| (label, p.max(0.0))).collect();
    let distribution = EmotionDistribution::from_weights(&weights)
        .map_err(|_| ModelError::NonFinite("class probability"))?;
    Ok(Classification {
        distribution,
        confidence,
        path: ClassifierPath::Model,
    })
}

fn heuristic(features: &FeatureVector, reason: FallbackReason) -> Classification {
    Classification {
        distribution: heuristic_distribution(&features.summary()),
        confidence: HEURISTIC_CONFIDENCE,
        path: ClassifierPath::Heuristic(reason),
    }
}

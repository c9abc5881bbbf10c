use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Serialize, Serializer};

use vx_core::config::TrainingConfig;
use vx_core::emotion::Emotion;

use crate::bundle::{BundleMetadata, ModelBundle};
use crate::error::ModelError;
use crate::scaler::StandardScaler;
use crate::softmax::{SoftmaxRegression, TrainParams, argmax};
use crate::store::TrainingStore;

/// Outcome of one retraining attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum RetrainResult {
    Trained {
        samples_used: usize,
        train_accuracy: f64,
        validation_accuracy: f64,
        classes: Vec<Emotion>,
    },
    Failed {
        reason: String,
    },
}

impl RetrainResult {
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, Self::Trained { .. })
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Flat wire form: `{"success": bool, ...}`.
#[derive(Serialize)]
struct RetrainWire<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples_used: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    train_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    classes: Option<&'a [Emotion]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl Serialize for RetrainResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Trained {
                samples_used,
                train_accuracy,
                validation_accuracy,
                classes,
            } => RetrainWire {
                success: true,
                samples_used: Some(*samples_used),
                train_accuracy: Some(*train_accuracy),
                validation_accuracy: Some(*validation_accuracy),
                classes: Some(classes.as_slice()),
                reason: None,
            },
            Self::Failed { reason } => RetrainWire {
                success: false,
                samples_used: None,
                train_accuracy: None,
                validation_accuracy: None,
                classes: None,
                reason: Some(reason.as_str()),
            },
        };
        wire.serialize(serializer)
    }
}

/// Fits a fresh bundle from the training log and persists it.
#[derive(Clone, Debug)]
pub struct Retrainer {
    model_path: PathBuf,
    min_samples: usize,
    validation_fraction: f64,
    seed: u64,
    params: TrainParams,
}

impl Retrainer {
    #[must_use]
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            min_samples: config.min_samples,
            validation_fraction: config.validation_fraction,
            seed: config.seed,
            params: TrainParams::from(config),
        }
    }

    /// Train on every stored sample. The bundle is returned only if it was
    /// also written to disk; on any failure the previous bundle file stays.
    pub fn retrain(&self, store: &TrainingStore) -> (RetrainResult, Option<ModelBundle>) {
        let samples = match store.load_all() {
            Ok(samples) => samples,
            Err(e) => return (RetrainResult::failed(e.to_string()), None),
        };
        if samples.len() < self.min_samples {
            return (
                RetrainResult::failed(format!(
                    "insufficient samples: {}/{}",
                    samples.len(),
                    self.min_samples
                )),
                None,
            );
        }

        let mut rows: Vec<(Vec<f64>, Emotion)> = samples
            .iter()
            .filter_map(|s| s.label().map(|label| (s.features.to_f64(), label)))
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        rows.shuffle(&mut rng);

        match self.fit(&rows) {
            Ok(bundle) => {
                if let Err(e) = bundle.save(&self.model_path) {
                    log::warn!("Retrained bundle could not be saved: {e}");
                    return (RetrainResult::failed(format!("persist failed: {e}")), None);
                }
                let m = &bundle.metadata;
                log::info!(
                    "Retrained on {} samples: train {:.3}, validation {:.3}",
                    m.samples_used,
                    m.train_accuracy,
                    m.validation_accuracy
                );
                let result = RetrainResult::Trained {
                    samples_used: m.samples_used,
                    train_accuracy: m.train_accuracy,
                    validation_accuracy: m.validation_accuracy,
                    classes: bundle.labels.clone(),
                };
                (result, Some(bundle))
            }
            Err(e) => (RetrainResult::failed(e.to_string()), None),
        }
    }

    fn fit(&self, rows: &[(Vec<f64>, Emotion)]) -> Result<ModelBundle, ModelError> {
        if rows.len() < 2 {
            return Err(ModelError::EmptyTrainingSet);
        }
        let labels: Vec<Emotion> = rows
            .iter()
            .map(|(_, l)| *l)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let class_of = |label: Emotion| labels.iter().position(|&l| l == label).unwrap_or(0);

        let n_val = ((rows.len() as f64 * self.validation_fraction).round() as usize)
            .clamp(1, rows.len() - 1);
        let (val_rows, train_rows) = rows.split_at(n_val);

        let train_x: Vec<Vec<f64>> = train_rows.iter().map(|(x, _)| x.clone()).collect();
        let train_y: Vec<usize> = train_rows.iter().map(|(_, l)| class_of(*l)).collect();

        let scaler = StandardScaler::fit(&train_x)?;
        let scale_all = |rows: &[(Vec<f64>, Emotion)]| -> Result<Vec<Vec<f64>>, ModelError> {
            rows.iter().map(|(x, _)| scaler.transform(x)).collect()
        };
        let train_scaled = scale_all(train_rows)?;
        let classifier = SoftmaxRegression::fit(&train_scaled, &train_y, labels.len(), self.params)?;

        let accuracy = |scaled: &[Vec<f64>], rows: &[(Vec<f64>, Emotion)]| -> Result<f64, ModelError> {
            let mut correct = 0usize;
            for (x, (_, label)) in scaled.iter().zip(rows) {
                let probs = classifier.predict_proba(x)?;
                if labels[argmax(&probs)] == *label {
                    correct += 1;
                }
            }
            Ok(correct as f64 / rows.len().max(1) as f64)
        };
        let train_accuracy = accuracy(&train_scaled, train_rows)?;
        let validation_accuracy = accuracy(&scale_all(val_rows)?, val_rows)?;

        Ok(ModelBundle {
            metadata: BundleMetadata {
                trained_at: Utc::now(),
                samples_used: rows.len(),
                train_accuracy,
                validation_accuracy,
            },
            scaler,
            classifier,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vx_core::emotion::EmotionDistribution;
    use vx_core::features::{FeatureVector, index};
    use vx_core::sample::TrainingSample;

    fn config(dir: &std::path::Path) -> TrainingConfig {
        TrainingConfig {
            store_path: dir.join("log.jsonl"),
            model_path: dir.join("model.bin"),
            epochs: 150,
            ..TrainingConfig::default()
        }
    }

    fn labelled(i: usize) -> TrainingSample {
        let loud = i % 2 == 1;
        let mut v = FeatureVector::zeros();
        v.set(index::ENERGY_MEAN, if loud { 0.3 } else { 0.01 });
        v.set(index::PITCH_MEAN, if loud { 250.0 } else { 100.0 } + i as f32 * 0.1);
        let label = if loud { Emotion::Anger } else { Emotion::Sadness };
        let emotions = EmotionDistribution::from_weights(&[(label, 0.8), (Emotion::Neutral, 0.2)])
            .expect("weights");
        TrainingSample::new(v, emotions, 2.0)
    }

    #[test]
    fn too_few_samples_fails_with_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(dir.path());
        let store = TrainingStore::open(&config.store_path).expect("open");
        for i in 0..49 {
            store.record(&labelled(i)).expect("record");
        }
        let (result, bundle) = Retrainer::new(&config).retrain(&store);
        assert_eq!(
            result,
            RetrainResult::Failed {
                reason: "insufficient samples: 49/50".into()
            }
        );
        assert!(bundle.is_none());
        assert!(!config.model_path.exists());
    }

    #[test]
    fn trains_and_persists_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(dir.path());
        let store = TrainingStore::open(&config.store_path).expect("open");
        for i in 0..60 {
            store.record(&labelled(i)).expect("record");
        }
        let (result, bundle) = Retrainer::new(&config).retrain(&store);
        let RetrainResult::Trained {
            samples_used,
            train_accuracy,
            validation_accuracy,
            classes,
        } = &result
        else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(*samples_used, 60);
        assert_eq!(classes, &vec![Emotion::Sadness, Emotion::Anger]);
        assert!(*train_accuracy > 0.95);
        assert!(*validation_accuracy > 0.9);
        let saved = ModelBundle::load(&config.model_path).expect("load");
        assert_eq!(Some(saved), bundle);
    }

    #[test]
    fn same_seed_gives_same_split() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(dir.path());
        let store = TrainingStore::open(&config.store_path).expect("open");
        for i in 0..50 {
            store.record(&labelled(i)).expect("record");
        }
        let retrainer = Retrainer::new(&config);
        let (a, _) = retrainer.retrain(&store);
        let (b, _) = retrainer.retrain(&store);
        assert_eq!(a, b);
    }

    #[test]
    fn result_serializes_with_success_flag() {
        let failed = serde_json::to_value(RetrainResult::failed("insufficient samples: 3/50"))
            .expect("json");
        assert_eq!(
            failed,
            serde_json::json!({"success": false, "reason": "insufficient samples: 3/50"})
        );
        let trained = serde_json::to_value(RetrainResult::Trained {
            samples_used: 60,
            train_accuracy: 1.0,
            validation_accuracy: 0.5,
            classes: vec![Emotion::Anger],
        })
        .expect("json");
        assert_eq!(trained["success"], true);
        assert_eq!(trained["classes"][0], "anger");
    }
}

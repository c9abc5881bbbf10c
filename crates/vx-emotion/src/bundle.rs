use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use vx_core::emotion::Emotion;
use vx_core::features::{FEATURE_DIM, FeatureVector};

use crate::error::ModelError;
use crate::scaler::StandardScaler;
use crate::softmax::SoftmaxRegression;

/// Provenance of a trained bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub trained_at: DateTime<Utc>,
    pub samples_used: usize,
    pub train_accuracy: f64,
    pub validation_accuracy: f64,
}

/// Scaler, classifier and label map, always loaded and replaced together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub scaler: StandardScaler,
    pub classifier: SoftmaxRegression,
    /// Class index to label.
    pub labels: Vec<Emotion>,
    pub metadata: BundleMetadata,
}

impl ModelBundle {
    /// Check that the parts agree with each other and with [`FEATURE_DIM`].
    ///
    /// # Errors
    /// [`ModelError::ShapeMismatch`] or [`ModelError::LabelMismatch`].
    pub fn validate(&self) -> Result<(), ModelError> {
        for dim in [self.scaler.dim(), self.classifier.dim()] {
            if dim != FEATURE_DIM {
                return Err(ModelError::ShapeMismatch {
                    expected: FEATURE_DIM,
                    got: dim,
                });
            }
        }
        if self.labels.len() != self.classifier.n_classes() {
            return Err(ModelError::LabelMismatch {
                labels: self.labels.len(),
                classes: self.classifier.n_classes(),
            });
        }
        Ok(())
    }

    /// Per-label probabilities for one feature vector, in class-index order.
    ///
    /// # Errors
    /// Fails if the bundle is inconsistent or evaluation produces non-finite values.
    pub fn predict(&self, features: &FeatureVector) -> Result<Vec<(Emotion, f64)>, ModelError> {
        self.validate()?;
        let scaled = self.scaler.transform(&features.to_f64())?;
        let probs = self.classifier.predict_proba(&scaled)?;
        Ok(self.labels.iter().copied().zip(probs).collect())
    }

    /// Persist atomically: write a temp file in the target directory, then rename over `path`.
    ///
    /// # Errors
    /// Fails on I/O or encoding errors; `path` is left untouched on failure.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            bincode::serialize_into(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| ModelError::Io(e.error))?;

        log::info!(
            "Saved model bundle to {} ({} classes)",
            path.display(),
            self.labels.len()
        );
        Ok(())
    }

    /// Load and validate a bundle written by [`Self::save`].
    ///
    /// # Errors
    /// Fails on I/O, decoding or validation errors.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = fs::File::open(path)?;
        let bundle: Self = bincode::deserialize_from(BufReader::new(file))?;
        bundle.validate()?;
        log::info!(
            "Loaded model bundle from {} (trained {}, {} samples)",
            path.display(),
            bundle.metadata.trained_at,
            bundle.metadata.samples_used
        );
        Ok(bundle)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::softmax::TrainParams;

    /// Tiny bundle separating two labels on the energy slot.
    pub(crate) fn toy_bundle() -> ModelBundle {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let mut row = vec![0.0; FEATURE_DIM];
            row[vx_core::features::index::ENERGY_MEAN] = if i % 2 == 0 { 0.01 } else { 0.3 };
            row[0] = i as f64;
            x.push(row);
            y.push(i % 2);
        }
        let scaler = StandardScaler::fit(&x).expect("fit scaler");
        let scaled: Vec<Vec<f64>> = x
            .iter()
            .map(|r| scaler.transform(r).expect("transform"))
            .collect();
        let classifier = SoftmaxRegression::fit(
            &scaled,
            &y,
            2,
            TrainParams {
                epochs: 200,
                learning_rate: 0.5,
                l2: 1e-3,
            },
        )
        .expect("fit classifier");
        ModelBundle {
            scaler,
            classifier,
            labels: vec![Emotion::Sadness, Emotion::Anger],
            metadata: BundleMetadata {
                trained_at: Utc::now(),
                samples_used: 20,
                train_accuracy: 1.0,
                validation_accuracy: 1.0,
            },
        }
    }

    #[test]
    fn save_then_load_restores_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("model.bin");
        let bundle = toy_bundle();
        bundle.save(&path).expect("save");
        let loaded = ModelBundle::load(&path).expect("load");
        assert_eq!(loaded, bundle);
        // no temp files left behind
        let entries = fs::read_dir(path.parent().expect("parent")).expect("read_dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn corrupt_file_fails_to_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.bin");
        fs::write(&path, b"definitely not bincode").expect("write");
        assert!(ModelBundle::load(&path).is_err());
    }

    #[test]
    fn label_map_mismatch_is_rejected() {
        let mut bundle = toy_bundle();
        bundle.labels.push(Emotion::Fear);
        assert!(matches!(
            bundle.validate(),
            Err(ModelError::LabelMismatch { labels: 3, classes: 2 })
        ));
    }

    #[test]
    fn predicts_separated_labels() {
        let bundle = toy_bundle();
        let mut quiet = FeatureVector::zeros();
        quiet.set(vx_core::features::index::ENERGY_MEAN, 0.01);
        quiet.set(0, 9.5);
        let probs = bundle.predict(&quiet).expect("predict");
        assert_eq!(probs[0].0, Emotion::Sadness);
        assert!(probs[0].1 > probs[1].1);
    }
}

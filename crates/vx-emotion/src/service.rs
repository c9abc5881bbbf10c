use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use serde::Serialize;

use vx_audio::error::AudioError;
use vx_audio::features::FeatureExtractor;
use vx_audio::normalize::AudioNormalizer;
use vx_core::config::VoxConfig;
use vx_core::emotion::EmotionDistribution;
use vx_core::features::{FeatureSummary, FeatureVector};
use vx_core::sample::TrainingSample;

use crate::bundle::ModelBundle;
use crate::classifier::{ClassifierPath, EmotionClassifier};
use crate::error::StoreError;
use crate::retrain::{RetrainResult, Retrainer};
use crate::store::TrainingStore;

/// Everything `analyze` reports about one recording.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResult {
    pub emotions: EmotionDistribution,
    pub confidence: f64,
    pub path: ClassifierPath,
    pub features: FeatureSummary,
    pub feature_vector: FeatureVector,
    /// Seconds; the declared duration when positive, else measured.
    pub duration: f64,
    /// Feature groups that fell back to their defaults.
    pub defaulted_features: Vec<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrainingStats {
    pub total_samples: u64,
    pub model_trained: bool,
    /// Sample count at which the next background retrain fires.
    pub next_retrain_at: u64,
    pub samples_until_retrain: u64,
    pub retrain_in_progress: bool,
}

struct Inner {
    normalizer: AudioNormalizer,
    extractor: FeatureExtractor,
    classifier: EmotionClassifier,
    store: TrainingStore,
    retrainer: Retrainer,
    retrain_every: u64,
    retrain_running: AtomicBool,
    /// Held across fit, save and install so disk and memory agree.
    retrain_lock: Mutex<()>,
    retrains_started: AtomicU64,
    background: Mutex<Option<JoinHandle<()>>>,
}

/// Facade over normalisation, extraction, classification and training.
///
/// Cheap to clone; clones share one store, one classifier and one
/// background-retrain slot.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use vx_core::config::VoxConfig;
/// use vx_emotion::EmotionService;
///
/// let service = EmotionService::open(&VoxConfig::default()).unwrap();
/// let result = service.analyze(Path::new("clip.wav"), None).unwrap();
/// println!("{:?}", result.emotions.dominant());
/// ```
#[derive(Clone)]
pub struct EmotionService {
    inner: Arc<Inner>,
}

impl EmotionService {
    /// Open the training log and load an existing bundle, if any.
    ///
    /// A corrupt or incompatible bundle is logged and ignored.
    ///
    /// # Errors
    /// Fails only if the training log cannot be opened.
    pub fn open(config: &VoxConfig) -> Result<Self, StoreError> {
        let store = TrainingStore::open(&config.training.store_path)?;

        let classifier = EmotionClassifier::new();
        let model_path = &config.training.model_path;
        if model_path.exists() {
            match ModelBundle::load(model_path) {
                Ok(bundle) => classifier.install(bundle),
                Err(e) => log::warn!(
                    "Ignoring unusable model bundle {}: {e}",
                    model_path.display()
                ),
            }
        }

        Ok(Self {
            inner: Arc::new(Inner {
                normalizer: AudioNormalizer::new(&config.audio),
                extractor: FeatureExtractor::new(&config.features, config.audio.sample_rate),
                classifier,
                store,
                retrainer: Retrainer::new(&config.training),
                retrain_every: config.training.retrain_every.max(1),
                retrain_running: AtomicBool::new(false),
                retrain_lock: Mutex::new(()),
                retrains_started: AtomicU64::new(0),
                background: Mutex::new(None),
            }),
        })
    }

    /// Normalise, extract and classify one recording.
    ///
    /// # Errors
    /// Only [`AudioError::Decode`]: extraction and classification always
    /// produce a result.
    pub fn analyze(
        &self,
        path: &Path,
        declared_duration: Option<f64>,
    ) -> Result<AnalysisResult, AudioError> {
        let signal = self.inner.normalizer.normalize(path)?;
        let extraction = self.inner.extractor.extract(&signal);

        if let Some(sibling) = signal.transcoded_path()
            && let Err(e) = std::fs::remove_file(sibling)
        {
            log::debug!("Could not remove {}: {e}", sibling.display());
        }

        let classification = self.inner.classifier.classify(&extraction.vector);
        let duration = declared_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| signal.duration());

        Ok(AnalysisResult {
            emotions: classification.distribution,
            confidence: classification.confidence,
            path: classification.path,
            features: extraction.vector.summary(),
            defaulted_features: extraction.defaulted().map(|r| r.group.name()).collect(),
            feature_vector: extraction.vector,
            duration,
        })
    }

    /// Append a training sample and return the new total.
    ///
    /// Every `retrain_every`-th sample starts a background retrain unless
    /// one is already running.
    ///
    /// # Errors
    /// Fails if the sample cannot be written.
    pub fn record_sample(
        &self,
        features: FeatureVector,
        emotions: EmotionDistribution,
        duration: f64,
    ) -> Result<u64, StoreError> {
        let total = self
            .inner
            .store
            .record(&TrainingSample::new(features, emotions, duration))?;
        if total % self.inner.retrain_every == 0 {
            self.spawn_background_retrain();
        }
        Ok(total)
    }

    #[must_use]
    pub fn training_stats(&self) -> TrainingStats {
        let total = self.inner.store.len();
        let every = self.inner.retrain_every;
        let next = (total / every + 1) * every;
        TrainingStats {
            total_samples: total,
            model_trained: self.inner.classifier.is_trained(),
            next_retrain_at: next,
            samples_until_retrain: next - total,
            retrain_in_progress: self.inner.retrain_running.load(Ordering::Acquire),
        }
    }

    /// Retrain synchronously on the caller's thread.
    ///
    /// Waits for a background retrain in progress to finish first.
    pub fn retrain(&self) -> RetrainResult {
        self.inner.run_retrain()
    }

    /// Block until a pending background retrain, if any, has finished.
    pub fn wait_for_background_retrain(&self) {
        let handle = self
            .inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            log::warn!("Background retrain thread panicked");
        }
    }

    /// Number of retrains started since the service was opened.
    #[must_use]
    pub fn retrains_started(&self) -> u64 {
        self.inner.retrains_started.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn classifier(&self) -> &EmotionClassifier {
        &self.inner.classifier
    }

    fn spawn_background_retrain(&self) {
        if self
            .inner
            .retrain_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::info!("Retrain already running, skipping trigger");
            return;
        }

        // The slot stays locked until the handle is stored; the thread waits
        // on it before doing anything, so it cannot clear the flag earlier.
        let mut slot = self
            .inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let inner = Arc::clone(&self.inner);
        let spawned = std::thread::Builder::new()
            .name("vx-retrain".into())
            .spawn(move || {
                drop(inner.background.lock().unwrap_or_else(PoisonError::into_inner));
                let result = inner.run_retrain();
                if !result.success() {
                    log::warn!("Background retrain did not produce a model: {result:?}");
                }
                inner.retrain_running.store(false, Ordering::Release);
            });

        match spawned {
            Ok(handle) => {
                // The predecessor has already cleared the flag.
                if let Some(previous) = slot.replace(handle)
                    && previous.join().is_err()
                {
                    log::warn!("Background retrain thread panicked");
                }
            }
            Err(e) => {
                log::warn!("Could not spawn retrain thread: {e}");
                self.inner.retrain_running.store(false, Ordering::Release);
            }
        }
    }
}

impl Inner {
    fn run_retrain(&self) -> RetrainResult {
        let _serial = self
            .retrain_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.retrains_started.fetch_add(1, Ordering::AcqRel);
        let (result, bundle) = self.retrainer.retrain(&self.store);
        if let Some(bundle) = bundle {
            self.classifier.install(bundle);
        }
        log::info!("Retrain finished: success={}", result.success());
        result
    }
}

// Emotion classification, training log and retraining for voxaffect.

pub mod bundle;
pub mod classifier;
pub mod error;
pub mod heuristic;
pub mod retrain;
pub mod scaler;
pub mod service;
pub mod softmax;
pub mod store;

pub use classifier::{Classification, ClassifierPath, EmotionClassifier, FallbackReason};
pub use error::{ModelError, StoreError};
pub use retrain::RetrainResult;
pub use service::{AnalysisResult, EmotionService, TrainingStats};

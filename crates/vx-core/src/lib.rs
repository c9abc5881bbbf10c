/// Configuration, types, and shared structures for voxaffect.
///
/// This crate contains the feature-vector contract, emotion labels and
/// distributions, training samples, and configuration loading shared by
/// the audio, emotion and app crates.

pub mod config;
pub mod emotion;
pub mod error;
pub mod features;
pub mod sample;

pub use config::VoxConfig;
pub use emotion::{Emotion, EmotionDistribution, EmotionScore};
pub use error::CoreError;
pub use features::{FEATURE_DIM, FeatureSummary, FeatureVector};
pub use sample::TrainingSample;

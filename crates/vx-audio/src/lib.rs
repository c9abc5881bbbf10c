// Audio normalisation and acoustic feature extraction for voxaffect.

pub mod decode;
pub mod error;
pub mod features;
pub mod fft;
pub mod mel;
pub mod normalize;
pub mod pitch;
pub mod resample;
pub mod signal;
pub mod spectral;
pub mod stats;
pub mod tempo;

pub use error::{AudioError, FeatureError};
pub use features::{Extraction, FeatureExtractor, FeatureGroup, GroupOutcome, GroupReport};
pub use normalize::AudioNormalizer;
pub use signal::CanonicalSignal;

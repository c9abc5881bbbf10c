use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of values in every [`FeatureVector`].
///
/// The layout is positional and shared between training and inference;
/// reordering invalidates every persisted model bundle.
pub const FEATURE_DIM: usize = 42;

/// Number of cepstral coefficients carried in the vector.
pub const N_MFCC: usize = 13;

/// Positional layout of a [`FeatureVector`].
pub mod index {
    pub const PITCH_MEAN: usize = 0;
    pub const PITCH_STD: usize = 1;
    pub const ENERGY_MEAN: usize = 2;
    pub const ENERGY_STD: usize = 3;
    pub const ZCR_MEAN: usize = 4;
    pub const ZCR_STD: usize = 5;
    pub const CENTROID_MEAN: usize = 6;
    pub const CENTROID_STD: usize = 7;
    pub const ROLLOFF_MEAN: usize = 8;
    pub const TEMPO: usize = 9;
    pub const CONTRAST_MEAN: usize = 10;
    pub const CONTRAST_STD: usize = 11;
    pub const CHROMA_MEAN: usize = 12;
    pub const CHROMA_STD: usize = 13;
    /// First MFCC slot; coefficient `k` occupies `MFCC_START + 2k` (mean) and `+ 1` (std).
    pub const MFCC_START: usize = 14;
    pub const SKEWNESS: usize = 40;
    pub const KURTOSIS: usize = 41;
}

/// Fixed-length acoustic feature vector.
///
/// Always exactly [`FEATURE_DIM`] values long; construction from a slice of
/// any other length fails.
///
/// # Example
/// ```
/// use vx_core::features::{FeatureVector, FEATURE_DIM};
/// let v = FeatureVector::zeros();
/// assert_eq!(v.as_slice().len(), FEATURE_DIM);
/// assert!(FeatureVector::new(vec![0.0; 3]).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Wrap `values`, checking the dimensionality.
    ///
    /// # Errors
    /// Returns [`CoreError::FeatureDimension`] if `values.len() != FEATURE_DIM`.
    pub fn new(values: Vec<f32>) -> Result<Self, CoreError> {
        if values.len() != FEATURE_DIM {
            return Err(CoreError::FeatureDimension {
                expected: FEATURE_DIM,
                got: values.len(),
            });
        }
        Ok(Self(values))
    }

    /// All-zero vector.
    #[must_use]
    pub fn zeros() -> Self {
        Self(vec![0.0; FEATURE_DIM])
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Value at a position from [`index`].
    #[inline]
    #[must_use]
    pub fn get(&self, idx: usize) -> f32 {
        self.0.get(idx).copied().unwrap_or(0.0)
    }

    /// Overwrite the value at `idx`. Out-of-range indices are ignored.
    pub fn set(&mut self, idx: usize, value: f32) {
        if let Some(slot) = self.0.get_mut(idx) {
            *slot = value;
        }
    }

    /// Widen to `f64` for model arithmetic.
    #[must_use]
    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().map(|&v| f64::from(v)).collect()
    }

    /// Condensed view returned to callers alongside a classification.
    #[must_use]
    pub fn summary(&self) -> FeatureSummary {
        FeatureSummary {
            pitch_mean: self.get(index::PITCH_MEAN),
            pitch_std: self.get(index::PITCH_STD),
            energy_mean: self.get(index::ENERGY_MEAN),
            zcr_mean: self.get(index::ZCR_MEAN),
            spectral_centroid_mean: self.get(index::CENTROID_MEAN),
            tempo: self.get(index::TEMPO),
        }
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = CoreError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(v: FeatureVector) -> Self {
        v.0
    }
}

/// Human-facing subset of the feature vector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub pitch_mean: f32,
    pub pitch_std: f32,
    pub energy_mean: f32,
    pub zcr_mean: f32,
    pub spectral_centroid_mean: f32,
    pub tempo: f32,
}

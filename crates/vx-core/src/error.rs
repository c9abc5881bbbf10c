use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A feature vector was built from a slice of the wrong length.
    #[error("feature vector must have {expected} values, got {got}")]
    FeatureDimension {
        /// Declared dimensionality.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },

    /// Unknown emotion label.
    #[error("unknown emotion label: {0}")]
    UnknownEmotion(String),

    /// Emotion scores could not be normalised (negative or non-finite weight).
    #[error("invalid emotion score for {label}: {score}")]
    InvalidScore {
        /// Offending label.
        label: String,
        /// Offending raw score.
        score: f64,
    },
}

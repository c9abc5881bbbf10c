use std::path::PathBuf;

use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The input could not be turned into a canonical signal.
    #[error("cannot decode {path}: {reason}")]
    Decode {
        /// Input file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The external transcoder could not be started.
    #[error("ffmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    /// Sample rate conversion failed.
    #[error("resampling failed: {0}")]
    Resample(String),
}

impl AudioError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Why one feature group could not be computed.
///
/// Never escapes extraction: the group's documented defaults are used instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// Not enough samples or frames for this group.
    #[error("signal too short: need {needed}, got {got}")]
    TooShort {
        /// Minimum length required.
        needed: usize,
        /// Length available.
        got: usize,
    },

    /// No voiced frame inside the pitch band.
    #[error("no voiced frames")]
    Unvoiced,

    /// The signal has no usable variation (silence or DC).
    #[error("degenerate signal: {0}")]
    Degenerate(&'static str),

    /// A computed statistic was NaN or infinite.
    #[error("non-finite {0}")]
    NonFinite(&'static str),
}

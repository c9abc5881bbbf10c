use thiserror::Error;

/// Errors from fitting, evaluating or persisting a model bundle.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Input width does not match what the model was fitted on.
    #[error("shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// NaN or infinity in inputs or outputs.
    #[error("non-finite {0}")]
    NonFinite(&'static str),

    #[error("empty training set")]
    EmptyTrainingSet,

    /// The classifier and the label map disagree on the number of classes.
    #[error("label map has {labels} entries but the classifier has {classes} classes")]
    LabelMismatch { labels: usize, classes: usize },

    #[error("bundle I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("bundle encoding: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Errors from the training log.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("training log I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("training sample serialisation: {0}")]
    Serialize(#[from] serde_json::Error),
}

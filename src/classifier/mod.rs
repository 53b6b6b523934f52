pub mod text;

use thiserror::Error;

use crate::inference::InferenceError;

pub use text::{LabelProbability, Padding, TextClassifier, TextPrediction, Vocabulary};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("input is empty after normalization")]
    EmptyInput,
    #[error("invalid vocabulary snapshot: {0}")]
    Vocabulary(String),
    #[error("invalid label snapshot: {0}")]
    Labels(String),
    #[error("model predicted class {0} which has no label")]
    UnknownClass(usize),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

//! Error types for mlm-bias

use thiserror::Error;

use crate::device::Device;

/// Result type alias using mlm-bias's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for measure computation
#[derive(Error, Debug)]
pub enum Error {
    /// Token ids, mask index or span indices are inconsistent with the
    /// sequence (e.g. an out-of-range masked index).
    #[error("Input shape error: {0}")]
    InputShape(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// The forward pass failed or produced unusable output.
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    #[error("Model returned no attention weights but attention weighting was requested")]
    MissingAttentions,

    #[error("Device mismatch: model resides on {model}, inputs targeted {requested}")]
    DeviceMismatch { model: Device, requested: Device },

    /// Empty span lists reaching a span measure under a strict policy.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Unsupported dtype: {0}")]
    UnsupportedDtype(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

//! Error types for the fraud risk scoring engine

use thiserror::Error;

/// Errors reported by fitting, scoring and model persistence.
#[derive(Error, Debug)]
pub enum ScoringError {
    /// Invalid fit parameters or training data. Fit aborts before any tree is built.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Scoring was requested before the forest and normalizer were fitted.
    #[error("Model not fitted: forest and normalizer must be fitted before scoring")]
    NotFitted,

    /// Query vector length differs from the trained dimensionality.
    #[error("Dimension mismatch: model expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Fit was cancelled before a single tree was completed.
    #[error("Fit cancelled before any tree was built")]
    Cancelled,

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Persisted model is structurally inconsistent.
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScoringError>;

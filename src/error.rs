//! Error handling for the resume matcher

use crate::store::JobId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {filename}")]
    UnsupportedFileType { filename: String },

    #[error("Failed to extract text from '{filename}': {cause}")]
    ExtractionFailure { filename: String, cause: String },

    #[error("Failed to read ZIP archive: {0}")]
    ZipReadFailure(String),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job {0} has no embedding")]
    NoEmbeddingForJob(JobId),

    #[error("Invalid embedding: expected {expected} dimensions, got {actual}")]
    InvalidEmbedding { expected: usize, actual: usize },

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("Embedding generation error: {0}")]
    Embedding(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, MatcherError>;

impl MatcherError {
    pub fn extraction(filename: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        MatcherError::ExtractionFailure {
            filename: filename.into(),
            cause: cause.to_string(),
        }
    }

    /// Validation failures the caller caused; never worth retrying.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MatcherError::JobNotFound(_)
                | MatcherError::NoEmbeddingForJob(_)
                | MatcherError::UnsupportedFileType { .. }
                | MatcherError::InvalidEmbedding { .. }
                | MatcherError::InvalidInput(_)
        )
    }
}

/// Storage collaborators usually surface `anyhow` errors
impl From<anyhow::Error> for MatcherError {
    fn from(err: anyhow::Error) -> Self {
        MatcherError::Store(err.to_string())
    }
}

/// Convert candle core errors to our custom error type
impl From<candle_core::Error> for MatcherError {
    fn from(err: candle_core::Error) -> Self {
        MatcherError::Embedding(err.to_string())
    }
}

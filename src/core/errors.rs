use thiserror::Error;

/// Errors surfaced by the retrieval subsystem.
///
/// Only `DimensionMismatch` and `InvalidPartition` indicate data-integrity
/// bugs and are allowed to escape the orchestrator; everything else is
/// absorbed into the fallback chain.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding model unavailable: {0}")]
    ModelLoad(String),
    #[error("embedding model not initialized")]
    NotInitialized,
    #[error("embedding dimension mismatch: query has {query} dims, chunk has {chunk}")]
    DimensionMismatch { query: usize, chunk: usize },
    #[error("invalid embeddings file {path}: {reason}")]
    InvalidPartition { path: String, reason: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl RetrievalError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RetrievalError::Internal(err.to_string())
    }

    /// True for the failures that signal corrupted or incompatible source
    /// data rather than an expected runtime condition.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            RetrievalError::DimensionMismatch { .. } | RetrievalError::InvalidPartition { .. }
        )
    }
}

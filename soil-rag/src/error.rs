//! Error types for the `soil-rag` crate.

use thiserror::Error;

/// Errors raised while retrieving from the knowledge base.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError { provider: String, message: String },

    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

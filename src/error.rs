//! Error types for the retrieval core.

use thiserror::Error;

/// Main error type for retrieval-core operations.
///
/// Backend failures inside the search path never surface through this type:
/// the searchers convert them to empty-result sentinels at their own
/// boundary. What remains here are the errors a caller can meaningfully
/// react to.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ingestion error: {message} (path: {path})")]
    Ingestion { message: String, path: String },

    #[error("Document loading error: {message} (path: {path})")]
    DocumentLoad { message: String, path: String },

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Generator error: {0}")]
    Generator(#[from] crate::generator::GeneratorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for retrieval-core operations.
pub type Result<T> = std::result::Result<T, RagError>;

//! Error types for Orbit.
//!
//! This module defines a unified error enum covering the failure taxonomy of
//! the ingestion and query pipelines plus the ambient categories
//! (configuration, I/O, serialization).
//!
//! An absent knowledge base is not an error: `initialize` returns `None` and
//! callers branch on it.

use thiserror::Error;

/// Unified error type for Orbit.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A query was issued before any knowledge base exists
    #[error("Knowledge base is not initialized. Ingest documents first.")]
    KnowledgeBaseNotInitialized,

    /// The retriever was invoked without an index handle
    #[error("Vector index is unavailable")]
    IndexUnavailable,

    /// An ingestion batch failed; nothing from the batch was persisted
    #[error("Ingestion failed for '{document}': {reason}")]
    Ingestion { document: String, reason: String },

    /// Similarity search or query embedding failed
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The LLM call failed or returned an unusable response
    #[error("Generation error: {0}")]
    Generation(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build an ingestion failure attributed to a document.
    pub fn ingestion(document: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AppError::Ingestion {
            document: document.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the assistant stays usable after this error.
    ///
    /// Everything except configuration problems is scoped to a single call.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::Config(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

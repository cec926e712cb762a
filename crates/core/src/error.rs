//! Error types for the draftwright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Backends and the index have their own bounded-context errors that fold
//! into the top-level [`Error`] via `#[from]`.

use thiserror::Error;

/// The top-level error type for all draftwright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Run inputs ---
    #[error("Required input missing: {0}")]
    InputMissing(String),

    // --- Generation / embedding backends ---
    #[error("Backend failure: {0}")]
    Backend(#[from] ProviderError),

    // --- Structured output from the backend ---
    #[error("Malformed structured output: {0}")]
    MalformedOutput(String),

    // --- Passage index ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Structural validation ---
    #[error("Validation failed: {0}")]
    Validation(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Passage index is not ready: no corpus has been indexed")]
    NotReady,

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to read corpus document {path}: {reason}")]
    Corpus { path: String, reason: String },
}

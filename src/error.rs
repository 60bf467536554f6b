//! Error types for docrelay
//!
//! This module provides error handling for all docrelay operations,
//! including chunking, PDF extraction, storage access and webhook calls.

use thiserror::Error;

/// Main error type for docrelay operations
#[derive(Error, Debug)]
pub enum DocrelayError {
    /// Invalid chunking, retrieval or webhook settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text processing errors
    #[error("Text processing error: {0}")]
    TextProcessing(String),

    /// PDF processing errors
    #[error("PDF processing error: {0}")]
    Pdf(String),

    /// Chunk storage could not be reached or failed mid-operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// The workflow webhook rejected the request or could not be reached
    #[error("Webhook error: {0}")]
    Webhook(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),
}

impl DocrelayError {
    /// Whether this error means the chunk store could not serve a request
    pub fn is_storage(&self) -> bool {
        matches!(self, DocrelayError::Storage(_))
    }
}

/// Result type alias for docrelay operations
pub type Result<T> = std::result::Result<T, DocrelayError>;

impl From<reqwest::Error> for DocrelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DocrelayError::Webhook(format!("request timed out: {}", err))
        } else {
            DocrelayError::Http(err.to_string())
        }
    }
}

impl From<lopdf::Error> for DocrelayError {
    fn from(err: lopdf::Error) -> Self {
        DocrelayError::Pdf(err.to_string())
    }
}

//! Custom error types for translation operations

use thiserror::Error;

use crate::core::models::DeviceKind;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Direction is not one of the supported language pairs
    #[error("Invalid direction: {direction}")]
    InvalidDirection {
        direction: String,
    },

    /// Requested execution device has no loaded models
    #[error("Device unavailable: {device}")]
    DeviceUnavailable {
        device: DeviceKind,
    },

    /// Model computation failed
    #[error("Inference error: {message}")]
    InferenceError {
        message: String,
    },

    /// Pipeline did not finish in time
    #[error("Translation timed out after {timeout_ms} ms")]
    TimeoutError {
        timeout_ms: u64,
    },

    /// Model could not be loaded at startup
    #[error("Failed to load model {model}: {message}")]
    ModelLoadError {
        model: String,
        message: String,
    },

    /// Model cache lookup or download failed
    #[error("Model cache error: {message}")]
    CacheError {
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TranslationError {
    /// Build an inference error from anything printable
    pub fn inference(message: impl ToString) -> Self {
        TranslationError::InferenceError {
            message: message.to_string(),
        }
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(err: config::ConfigError) -> Self {
        TranslationError::ConfigError {
            message: err.to_string(),
        }
    }
}

impl From<cached_path::Error> for TranslationError {
    fn from(err: cached_path::Error) -> Self {
        TranslationError::CacheError {
            message: err.to_string(),
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

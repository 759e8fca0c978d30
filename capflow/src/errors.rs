//! Error types for the capflow pipeline.
//!
//! Stage failures are not errors here: a provider that cannot complete
//! returns `StageOutcome::Failure`, which the executor turns into a degraded
//! outcome. The types in this module cover what can go wrong *around* a run:
//! malformed requests, bad configuration, and bookkeeping conflicts.

use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for capflow operations.
#[derive(Debug, Error)]
pub enum CapflowError {
    /// The request was rejected before a run started.
    #[error("{0}")]
    InvalidRequest(#[from] InvalidRequestError),

    /// The pipeline configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A stage output was recorded twice within one run.
    #[error("{0}")]
    OutputConflict(#[from] OutputConflictError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a request source can hand over an unusable request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequestError {
    /// Neither text nor attachments were supplied.
    #[error("Request has no text and no attachments")]
    EmptyRequest,

    /// The language tag is not one of the supported identifiers.
    #[error("{0}")]
    UnknownLanguage(#[from] UnknownLanguageError),

    /// An attachment reference cannot be used.
    #[error("Invalid attachment '{name}': {reason}")]
    InvalidAttachment {
        /// The attachment name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl InvalidRequestError {
    /// Creates an invalid attachment error.
    #[must_use]
    pub fn invalid_attachment(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttachment {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Converts to a dictionary representation for diagnostics displays.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::EmptyRequest => {
                map.insert("type".to_string(), json!("EmptyRequest"));
            }
            Self::UnknownLanguage(err) => {
                map.insert("type".to_string(), json!("UnknownLanguage"));
                map.insert("tag".to_string(), json!(err.tag));
            }
            Self::InvalidAttachment { name, reason } => {
                map.insert("type".to_string(), json!("InvalidAttachment"));
                map.insert("name".to_string(), json!(name));
                map.insert("reason".to_string(), json!(reason));
            }
        }

        map.insert("message".to_string(), json!(self.to_string()));
        map
    }
}

/// Error raised when a language tag is outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language tag: '{tag}'")]
pub struct UnknownLanguageError {
    /// The offending tag.
    pub tag: String,
}

impl UnknownLanguageError {
    /// Creates a new unknown language error.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

/// Error raised when a configuration value is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration for '{field}': {message}")]
pub struct ConfigError {
    /// The configuration field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error raised when writing a second output for the same stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Output conflict for stage '{stage}': output already recorded")]
pub struct OutputConflictError {
    /// The stage identifier.
    pub stage: String,
}

impl OutputConflictError {
    /// Creates a new output conflict error.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
        }
    }
}

//! # Store Errors

use thiserror::Error;

/// Result type for document store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the document store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    // ==================
    // Client Errors
    // ==================

    /// A filter operand or document value could not be cast to the field type
    #[error("Invalid {path}: {value}.")]
    Cast { path: String, value: String },

    /// A unique index already holds this value
    #[error("Duplicate field value: {value}. Please use another value!")]
    Duplicate { value: String },

    /// Schema validators rejected the document
    #[error("Invalid input data. {}", .messages.join(". "))]
    Validation { messages: Vec<String> },

    /// Filter used an operator the store does not know
    #[error("Unknown operator: {operator}")]
    UnknownOperator { operator: String },

    /// Projection mixed inclusion and exclusion
    #[error("Projection cannot mix inclusion and exclusion")]
    MixedProjection,

    // ==================
    // Internal Errors
    // ==================

    /// Collection was never registered
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// A decorator could not complete its hook
    #[error("Decorator {decorator} failed: {message}")]
    Hook {
        decorator: &'static str,
        message: String,
    },

    /// A stored document does not fit its typed model
    #[error("Cannot decode {collection} document: {message}")]
    Decode { collection: String, message: String },

    /// A writer panicked while holding the collection lock
    #[error("Lock poisoned on collection {0}")]
    Poisoned(String),
}

impl StoreError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Cast { .. } => 400,
            StoreError::Duplicate { .. } => 400,
            StoreError::Validation { .. } => 400,
            StoreError::UnknownOperator { .. } => 400,
            StoreError::MixedProjection => 400,
            StoreError::UnknownCollection(_) => 500,
            StoreError::Hook { .. } => 500,
            StoreError::Decode { .. } => 500,
            StoreError::Poisoned(_) => 500,
        }
    }

    /// Whether the message is safe to show a client
    pub fn is_operational(&self) -> bool {
        self.status_code() < 500
    }

    pub(crate) fn decode(collection: &str, err: serde_json::Error) -> Self {
        StoreError::Decode {
            collection: collection.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn cast(path: &str, value: &serde_json::Value) -> Self {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        StoreError::Cast {
            path: path.to_string(),
            value,
        }
    }
}

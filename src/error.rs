//! Error handling for the form builder, codec, store and submission engine
//!
//! One `thiserror` enum covers every layer so that callers can match on the
//! recoverable conditions (duplicate keys, protected elements, name conflicts)
//! without downcasting.

use thiserror::Error;

use crate::forms::document::ElementId;

/// Main error type for the forms system
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Key '{key}' is already used by another element")]
    DuplicateKey { key: String },

    #[error("The submit control cannot be removed or moved")]
    ProtectedElement,

    #[error("Unknown element type '{type_id}'")]
    UnknownElementType { type_id: String },

    #[error("Malformed form document: {reason}")]
    MalformedDocument { reason: String },

    #[error("A form named '{name}' already exists")]
    Conflict { name: String },

    #[error("Form not found: {reference}")]
    NotFound { reference: String },

    #[error("Form unavailable: {reference}")]
    FormUnavailable { reference: String },

    #[error("Case API {operation} failed{}: {message}", status_suffix(.status))]
    ExternalApi {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("Element {0} not found")]
    ElementNotFound(ElementId),

    #[error("No element is being edited")]
    NoActiveEdit,

    #[error("Settings for '{expected}' cannot be applied to a '{found}' element")]
    SettingsMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Index {index} out of range for {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Required element '{key}' needs a label")]
    MissingLabel { key: String },

    #[error("Form has no input field with key '{key}'")]
    UnknownField { key: String },

    #[error("A form needs a name before it can be saved")]
    MissingFormName,

    #[error("Invalid CSV upload: {0}")]
    InvalidCsv(String),

    #[error("Invalid file upload: {0}")]
    InvalidUpload(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl FormError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        FormError::MalformedDocument {
            reason: reason.into(),
        }
    }

    pub(crate) fn external(
        operation: &'static str,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        FormError::ExternalApi {
            operation,
            status,
            message: message.into(),
        }
    }

    /// True for errors the builder resolves locally without touching the document.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FormError::DuplicateKey { .. }
                | FormError::ProtectedElement
                | FormError::MissingLabel { .. }
        )
    }
}

impl From<csv::Error> for FormError {
    fn from(error: csv::Error) -> Self {
        FormError::InvalidCsv(error.to_string())
    }
}

impl From<reqwest::Error> for FormError {
    fn from(error: reqwest::Error) -> Self {
        FormError::external(
            "request",
            error.status().map(|s| s.as_u16()),
            error.to_string(),
        )
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for FormError {
    fn from(error: sqlx::Error) -> Self {
        FormError::Storage(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FormError>;

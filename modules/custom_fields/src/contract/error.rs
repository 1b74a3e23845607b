//! Contract error types for custom fields
//!
//! These errors are transport-agnostic and carry user-facing messages that
//! name the responsible field by label.

/// Custom fields engine errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CustomFieldsError {
    /// A visible field failed a local check. Nothing was sent.
    #[error("{message}")]
    Validation {
        /// Machine name of the failing field
        key: String,
        /// Display name of the failing field
        label: String,
        /// User-facing message
        message: String,
    },

    /// Control input could not be coerced into the field's value
    #[error("Invalid input for {label}: '{input}'")]
    Coercion { label: String, input: String },

    /// A file upload for a single field failed. The form is unchanged.
    #[error("Upload failed for {label}: {message}")]
    Upload { label: String, message: String },

    /// Some field-value upserts failed. Successful ones stay committed.
    #[error("Failed to save {failed} of {total} custom field(s): {}", .labels.join(", "))]
    PartialPersistence {
        failed: usize,
        total: usize,
        /// Labels of the failed fields, in display order
        labels: Vec<String>,
    },

    /// The form was loaded for a different entity instance than the one
    /// it is being saved for. Nothing was sent.
    #[error("Form was loaded for {expected} but submitted for {actual}")]
    InstanceMismatch { expected: String, actual: String },

    /// No definition with this key exists on the form
    #[error("Unknown custom field: {key}")]
    UnknownField { key: String },

    /// The definition source could not be read
    #[error("Failed to load custom fields: {message}")]
    Source { message: String },

    #[error("Internal error")]
    Internal,
}

impl CustomFieldsError {
    /// Required-field failure for a definition
    pub fn required(key: &str, label: &str) -> Self {
        Self::Validation {
            key: key.to_string(),
            label: label.to_string(),
            message: format!("{} is required", label),
        }
    }

    /// Value check failure for a definition
    pub fn invalid(key: &str, label: &str, reason: impl std::fmt::Display) -> Self {
        Self::Validation {
            key: key.to_string(),
            label: label.to_string(),
            message: format!("{}: {}", label, reason),
        }
    }

    /// Number of failed fields for a partial persistence failure
    pub fn failed_count(&self) -> Option<usize> {
        match self {
            Self::PartialPersistence { failed, .. } => Some(*failed),
            _ => None,
        }
    }
}

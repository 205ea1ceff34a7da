//! Error types and handling for `civicwatch`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for glue code
//! - Provides recovery hints for user-facing errors
//! - Duplicate conflicts never appear here: backends resolve them locally
//!   (insert-or-fetch for nonces, success for repeated votes)
//! - Upload failures never appear here either; they travel as [`Warning`]s
//!   next to a successful creation result

mod structured;

pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `civicwatch` operations.
#[derive(Error, Debug)]
pub enum CivicError {
    // === Configuration Errors ===
    /// The configured backend could not be constructed.
    #[error("Configuration error: {0}")]
    Config(String),

    // === Identity Errors ===
    /// A mutation was attempted without an active identity.
    #[error("Sign-in required to {action}")]
    AuthenticationRequired { action: String },

    /// The caller is signed in but lacks the role required for the action.
    #[error("Not authorized to {action}")]
    Unauthorized { action: String },

    // === Issue Errors ===
    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    // === Flow Errors ===
    /// A submission is already in flight on this controller.
    #[error("A submission is already in progress")]
    SubmissionInFlight,

    /// The active backend does not offer this operation.
    #[error("'{operation}' is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    // === Backend Errors ===
    /// Any other backend failure. Surfaced for manual retry, never retried here.
    #[error("Backend request failed: {0}")]
    Transient(String),

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database file could not be opened at the given path.
    #[error("Cannot open database at '{path}': {reason}")]
    DatabaseOpen { path: PathBuf, reason: String },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl CivicError {
    /// Is retrying the same intent by the same caller meaningful?
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationRequired { .. } | Self::SubmissionInFlight | Self::Transient(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check data-mode, remote.url and remote.anon-key"),
            Self::AuthenticationRequired { .. } => Some("Sign in, then retry"),
            Self::Unauthorized { .. } => Some("Only the authority role can change issue status"),
            Self::IssueNotFound { .. } => Some("Refresh the list; the issue may have been removed"),
            Self::SubmissionInFlight => Some("Wait for the current submission to finish"),
            Self::Transient(_) => Some("Retry; a new submission is minted for each attempt"),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    #[must_use]
    pub fn auth_required(action: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            action: action.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(action: impl Into<String>) -> Self {
        Self::Unauthorized {
            action: action.into(),
        }
    }

    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::IssueNotFound { id: id.into() }
    }
}

/// Result type using `CivicError`.
pub type Result<T> = std::result::Result<T, CivicError>;

/// A recoverable problem reported alongside a successful result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The image could not be stored; the issue was created without it.
    UploadFailed { reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UploadFailed { reason } => {
                write!(f, "image upload failed, issue saved without image: {reason}")
            }
        }
    }
}

//! Structured error output.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::CivicError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Config Errors (exit code 2) ===
    /// Backend could not be constructed
    ConfigError,
    /// Config file could not be parsed
    ConfigParseError,

    // === Identity Errors (exit code 3) ===
    /// No active identity for a mutation
    AuthenticationRequired,
    /// Identity lacks the required role
    Unauthorized,

    // === Issue Errors (exit code 4) ===
    /// Issue with specified ID not found
    IssueNotFound,

    // === Validation Errors (exit code 5) ===
    /// Field validation failed
    ValidationFailed,
    /// A submission is already running
    SubmissionInFlight,
    /// Operation not offered by the active backend
    Unsupported,

    // === Backend Errors (exit code 6) ===
    /// Network or server failure
    TransientNetwork,
    /// Local database failure
    DatabaseError,

    // === Internal Errors (exit code 1) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::ConfigParseError => "CONFIG_PARSE_ERROR",
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::SubmissionInFlight => "SUBMISSION_IN_FLIGHT",
            Self::Unsupported => "UNSUPPORTED",
            Self::TransientNetwork => "TRANSIENT_NETWORK",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable by the same caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationRequired
                | Self::ValidationFailed
                | Self::SubmissionInFlight
                | Self::TransientNetwork
        )
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Config errors
    /// - 3: Identity errors
    /// - 4: Issue errors
    /// - 5: Validation errors
    /// - 6: Backend errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError | Self::ConfigParseError => 2,
            Self::AuthenticationRequired | Self::Unauthorized => 3,
            Self::IssueNotFound => 4,
            Self::ValidationFailed | Self::SubmissionInFlight | Self::Unsupported => 5,
            Self::TransientNetwork | Self::DatabaseError => 6,
            Self::IoError | Self::JsonError | Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `CivicError`.
    #[must_use]
    pub fn from_error(err: &CivicError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);

        Self {
            code,
            message: err.to_string(),
            hint: err.suggestion().map(str::to_string),
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Format as a JSON value for machine output.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &CivicError) -> (ErrorCode, Option<Value>) {
        match err {
            CivicError::Config(_) => (ErrorCode::ConfigError, None),
            CivicError::Yaml(_) => (ErrorCode::ConfigParseError, None),
            CivicError::AuthenticationRequired { action } => (
                ErrorCode::AuthenticationRequired,
                Some(json!({ "action": action })),
            ),
            CivicError::Unauthorized { action } => {
                (ErrorCode::Unauthorized, Some(json!({ "action": action })))
            }
            CivicError::IssueNotFound { id } => {
                (ErrorCode::IssueNotFound, Some(json!({ "id": id })))
            }
            CivicError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({ "field": field, "reason": reason })),
            ),
            CivicError::ValidationErrors { errors } => (
                ErrorCode::ValidationFailed,
                Some(json!({
                    "errors": errors
                        .iter()
                        .map(|e| json!({ "field": e.field, "reason": e.message }))
                        .collect::<Vec<_>>()
                })),
            ),
            CivicError::SubmissionInFlight => (ErrorCode::SubmissionInFlight, None),
            CivicError::Unsupported { operation, backend } => (
                ErrorCode::Unsupported,
                Some(json!({ "operation": operation, "backend": backend })),
            ),
            CivicError::Transient(_) => (ErrorCode::TransientNetwork, None),
            CivicError::Database(_) => (ErrorCode::DatabaseError, None),
            CivicError::DatabaseOpen { path, .. } => (
                ErrorCode::ConfigError,
                Some(json!({ "path": path.display().to_string() })),
            ),
            CivicError::Io(_) => (ErrorCode::IoError, None),
            CivicError::Json(_) => (ErrorCode::JsonError, None),
            CivicError::Other(_) => (ErrorCode::InternalError, None),
        }
    }
}

//! Error types for `issues-core`.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for issue tracker operations.
#[derive(Error, Debug)]
pub enum IssuesError {
    // === Lookup Errors ===
    /// No issue with this number exists in the repository.
    #[error("Issue not found: {owner}/{repo}#{number}")]
    IssueNotFound {
        owner: String,
        repo: String,
        number: u64,
    },

    /// No comment with this id exists (in the addressed repository).
    #[error("Comment not found: {id}")]
    CommentNotFound { id: u64 },

    /// The repository has never had an issue filed against it.
    #[error("Repository not found: {owner}/{repo}")]
    RepositoryNotFound { owner: String, repo: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Unknown issue state value.
    #[error("Invalid state: {state}")]
    InvalidState { state: String },

    /// Unknown or disallowed state reason value.
    #[error("Invalid state_reason: {reason}")]
    InvalidStateReason { reason: String },

    // === JSONL Errors ===
    /// Failed to parse a line in the JSONL file.
    #[error("JSONL parse error at line {line}: {reason}")]
    JsonlParse { line: usize, reason: String },

    // === Storage Errors ===
    /// Generic storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File not found at the specified path.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
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

impl IssuesError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

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

    /// True for the "unknown reference" family (HTTP 404).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IssueNotFound { .. }
                | Self::CommentNotFound { .. }
                | Self::RepositoryNotFound { .. }
        )
    }

    /// True for malformed or missing client input (HTTP 422).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::ValidationErrors { .. }
                | Self::InvalidState { .. }
                | Self::InvalidStateReason { .. }
        )
    }

    /// Flatten any validation-family error into field-level entries.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        match self {
            Self::Validation { field, reason } => vec![ValidationError::new(field, reason)],
            Self::ValidationErrors { errors } => errors.clone(),
            Self::InvalidState { state } => {
                vec![ValidationError::new("state", format!("invalid value '{state}'"))]
            }
            Self::InvalidStateReason { reason } => vec![ValidationError::new(
                "state_reason",
                format!("invalid value '{reason}'"),
            )],
            _ => Vec::new(),
        }
    }
}

/// Result type using `IssuesError`.
pub type Result<T> = std::result::Result<T, IssuesError>;

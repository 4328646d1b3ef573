//! Error types for the access control module.
//!
//! Access denial is expressed via [`Decision::Denied`](crate::Decision),
//! not as an error variant. Everything here aborts the evaluation.

use std::fmt;

use thiserror::Error;

/// Boxed error preserved as the cause of a failed lookup.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable classification of evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The configured action is not one of create/read/update/delete.
    InvalidAction,
    /// Ownership check configured without exactly two operands.
    InvalidOperands,
    /// No principal attached to the request.
    MissingPrincipal,
    /// Model-backed lookup matched zero rows.
    NotFound,
    /// The persistence collaborator failed.
    PersistenceError,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidAction => "invalid_action",
            Self::InvalidOperands => "invalid_operands",
            Self::MissingPrincipal => "missing_principal",
            Self::NotFound => "not_found",
            Self::PersistenceError => "persistence_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`RecordLookup`](crate::RecordLookup) implementation.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The backing store rejected or failed the query.
    #[error("record lookup failed: {0}")]
    Backend(#[source] BoxError),

    /// The lookup could not be performed for a reason other than a backend failure.
    #[error("record lookup failed: {0}")]
    Internal(String),
}

impl LookupError {
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }
}

/// Failure while resolving the two ownership operands.
#[derive(Debug, Error)]
pub enum OperandError {
    /// Zero rows matched the model-backed point lookup.
    #[error("no '{table}' record with {key_column} = {key_value}")]
    NotFound {
        table: String,
        key_column: String,
        key_value: String,
    },

    /// The persistence collaborator failed; the cause is preserved.
    #[error(transparent)]
    Persistence(#[from] LookupError),
}

/// Errors that abort an evaluation.
#[derive(Debug, Error)]
pub enum AccessControlError {
    #[error("invalid action '{action}'")]
    InvalidAction { action: String },

    #[error("ownership check requires exactly two operands, got {count}")]
    InvalidOperands { count: usize },

    #[error("no principal attached to the request")]
    MissingPrincipal,

    #[error("failed to resolve ownership operands: {0}")]
    OperandResolutionFailed(#[from] OperandError),
}

impl AccessControlError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAction { .. } => ErrorKind::InvalidAction,
            Self::InvalidOperands { .. } => ErrorKind::InvalidOperands,
            Self::MissingPrincipal => ErrorKind::MissingPrincipal,
            Self::OperandResolutionFailed(OperandError::NotFound { .. }) => ErrorKind::NotFound,
            Self::OperandResolutionFailed(OperandError::Persistence(_)) => {
                ErrorKind::PersistenceError
            }
        }
    }
}

//! Error types for operation identifier and type parsing.

use thiserror::Error;

/// Errors returned while constructing operation domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationDomainError {
    /// An identifier is empty after trimming.
    #[error("{kind} must not be empty")]
    EmptyIdentifier {
        /// Identifier kind, for example `session_id`.
        kind: &'static str,
    },

    /// An identifier exceeds the storage limit.
    #[error("{kind} exceeds {limit} character limit: {value}")]
    IdentifierTooLong {
        /// Identifier kind.
        kind: &'static str,
        /// Maximum accepted length.
        limit: usize,
        /// Rejected value.
        value: String,
    },

    /// An identifier contains control characters.
    #[error("{kind} '{value}' contains control characters")]
    InvalidIdentifier {
        /// Identifier kind.
        kind: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Error returned while parsing an operation type name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown operation type: {0}")]
pub struct ParseOperationTypeError(pub String);

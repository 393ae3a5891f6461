//! Terminal outcome of an operation.

use super::OperationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationErrorKind {
    /// Malformed operation: unknown type or missing payload field.
    Validation,
    /// Retryable backend failure or deadline expiry, retries exhausted.
    Transient,
    /// Non-retryable rejection from the memory store.
    Permanent,
    /// Unexpected fault inside the orchestrator while executing.
    Internal,
}

impl OperationErrorKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for OperationErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Structured error recorded in a failed [`OperationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// Failure classification.
    pub kind: OperationErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Number of store invocations attempted before giving up.
    pub attempts: u32,
}

impl OperationError {
    /// Creates a validation error; no store call was made.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: OperationErrorKind::Validation,
            message: message.into(),
            attempts: 0,
        }
    }

    /// Creates an error of `kind` after `attempts` store invocations.
    #[must_use]
    pub fn after_attempts(kind: OperationErrorKind, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts,
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Succeeded { result: Value },
    Failed { error: OperationError },
}

/// Result of exactly one operation, created once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    operation_id: OperationId,
    #[serde(flatten)]
    outcome: Outcome,
    completed_at: DateTime<Utc>,
}

impl OperationResult {
    /// Creates a successful result carrying the store payload unchanged.
    #[must_use]
    pub const fn succeeded(
        operation_id: OperationId,
        result: Value,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            operation_id,
            outcome: Outcome::Succeeded { result },
            completed_at,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub const fn failed(
        operation_id: OperationId,
        error: OperationError,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            operation_id,
            outcome: Outcome::Failed { error },
            completed_at,
        }
    }

    /// Returns the operation this result belongs to.
    #[must_use]
    pub const fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    /// Returns whether the operation succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }

    /// Returns the store payload for successful operations.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Succeeded { result } => Some(result),
            Outcome::Failed { .. } => None,
        }
    }

    /// Returns the error for failed operations.
    #[must_use]
    pub const fn error(&self) -> Option<&OperationError> {
        match &self.outcome {
            Outcome::Succeeded { .. } => None,
            Outcome::Failed { error } => Some(error),
        }
    }

    /// Returns the completion time.
    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

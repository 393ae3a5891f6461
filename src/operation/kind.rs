//! Operation type vocabulary.

use super::ParseOperationTypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of memory operations a session can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Store new memory content.
    Save,
    /// Semantic search over stored memories.
    Search,
    /// Store content with graph extraction emphasised.
    SaveGraph,
    /// Search with graph relations.
    SearchGraph,
    /// Search scoped to a single named entity.
    AnalyzeEntity,
}

impl OperationType {
    /// All operation types in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Save,
        Self::Search,
        Self::SaveGraph,
        Self::SearchGraph,
        Self::AnalyzeEntity,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Search => "search",
            Self::SaveGraph => "save_graph",
            Self::SearchGraph => "search_graph",
            Self::AnalyzeEntity => "analyze_entity",
        }
    }

    /// Returns whether the operation writes to the memory store.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Save | Self::SaveGraph)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OperationType {
    type Error = ParseOperationTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "save" => Ok(Self::Save),
            "search" => Ok(Self::Search),
            "save_graph" => Ok(Self::SaveGraph),
            "search_graph" => Ok(Self::SearchGraph),
            "analyze_entity" => Ok(Self::AnalyzeEntity),
            _ => Err(ParseOperationTypeError(value.to_owned())),
        }
    }
}

/// Operation type as requested by a caller.
///
/// Unrecognised names are still accepted into a session so the attempt is
/// recorded; the activity executor resolves them to a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    /// A supported operation type.
    Known(OperationType),
    /// A name that does not match any supported operation type.
    Unrecognized(String),
}

impl OperationKind {
    /// Parses a requested operation type name.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        OperationType::try_from(value)
            .map_or_else(|_| Self::Unrecognized(value.trim().to_owned()), Self::Known)
    }

    /// Returns the supported operation type, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ParseOperationTypeError`] for unrecognised names.
    pub fn known(&self) -> Result<OperationType, ParseOperationTypeError> {
        match self {
            Self::Known(operation_type) => Ok(*operation_type),
            Self::Unrecognized(raw) => Err(ParseOperationTypeError(raw.clone())),
        }
    }

    /// Returns the requested name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(operation_type) => operation_type.as_str(),
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<OperationType> for OperationKind {
    fn from(value: OperationType) -> Self {
        Self::Known(value)
    }
}

impl From<String> for OperationKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<OperationKind> for String {
    fn from(value: OperationKind) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

//! Translation of an accepted operation into a memory store call.

use super::{ActivityOptions, AddMemoryRequest, SearchMemoryRequest};
use crate::operation::{Operation, OperationError, OperationKind, OperationType};
use serde_json::Value;

/// Metadata key carrying the search result limit.
const LIMIT_KEY: &str = "limit";
/// Metadata key naming the entity under analysis.
const ENTITY_NAME_KEY: &str = "entity_name";
/// Metadata key stamped on saves so the store can correlate completions.
const OPERATION_ID_KEY: &str = "operation_id";
/// Metadata flag added to graph-focused saves.
const GRAPH_FOCUSED_KEY: &str = "graph_focused";

/// A fully validated memory store invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// Store new content.
    Add(AddMemoryRequest),
    /// Search stored content.
    Search(SearchMemoryRequest),
}

impl StoreCall {
    /// Plans the store call for `operation`.
    ///
    /// Dispatch is exhaustive over [`OperationType`]: saves map to an add,
    /// searches and entity analysis map to a search.
    ///
    /// # Errors
    ///
    /// Returns a validation [`OperationError`] for unrecognised operation
    /// types and for payloads missing their required text.
    pub fn plan(operation: &Operation, options: &ActivityOptions) -> Result<Self, OperationError> {
        let operation_type = match operation.operation_type() {
            OperationKind::Known(operation_type) => *operation_type,
            OperationKind::Unrecognized(raw) => {
                return Err(OperationError::validation(format!(
                    "unknown operation type: {raw}"
                )));
            }
        };

        match operation_type {
            OperationType::Save => Self::plan_add(operation, false),
            OperationType::SaveGraph => Self::plan_add(operation, true),
            OperationType::Search | OperationType::SearchGraph => {
                let query = required_text(operation.payload().text(), operation_type, "query")?;
                Ok(Self::Search(search_request(operation, query, None, options)?))
            }
            OperationType::AnalyzeEntity => {
                let entity = operation
                    .payload()
                    .metadata_str(ENTITY_NAME_KEY)
                    .map(str::to_owned)
                    .map_or_else(
                        || required_text(operation.payload().text(), operation_type, "entity name"),
                        Ok,
                    )?;
                Ok(Self::Search(search_request(
                    operation,
                    entity.clone(),
                    Some(entity),
                    options,
                )?))
            }
        }
    }

    fn plan_add(operation: &Operation, graph_focused: bool) -> Result<Self, OperationError> {
        let operation_type = if graph_focused {
            OperationType::SaveGraph
        } else {
            OperationType::Save
        };
        let content = required_text(operation.payload().text(), operation_type, "content")?;

        let mut metadata = operation.payload().metadata().clone();
        metadata.insert(
            OPERATION_ID_KEY.to_owned(),
            Value::String(operation.operation_id().as_str().to_owned()),
        );
        if graph_focused {
            metadata.insert(GRAPH_FOCUSED_KEY.to_owned(), Value::Bool(true));
        }

        Ok(Self::Add(AddMemoryRequest {
            content,
            user_id: operation.user_id().clone(),
            agent_id: operation.agent_id().cloned(),
            session_id: Some(operation.session_id().clone()),
            metadata,
            correlation_id: Some(operation.operation_id().clone()),
        }))
    }
}

fn required_text(
    text: &str,
    operation_type: OperationType,
    field: &str,
) -> Result<String, OperationError> {
    if text.trim().is_empty() {
        return Err(OperationError::validation(format!(
            "{operation_type} requires a non-empty {field}"
        )));
    }
    Ok(text.to_owned())
}

fn search_request(
    operation: &Operation,
    query: String,
    entity: Option<String>,
    options: &ActivityOptions,
) -> Result<SearchMemoryRequest, OperationError> {
    let limit = match operation.payload().metadata().get(LIMIT_KEY) {
        None | Some(Value::Null) => options.default_search_limit,
        Some(value) => value
            .as_u64()
            .and_then(|raw| u32::try_from(raw).ok())
            .filter(|limit| *limit > 0)
            .ok_or_else(|| {
                OperationError::validation(format!("limit must be a positive integer, got {value}"))
            })?,
    };

    Ok(SearchMemoryRequest {
        query,
        user_id: operation.user_id().clone(),
        agent_id: operation.agent_id().cloned(),
        session_id: Some(operation.session_id().clone()),
        limit,
        entity,
        correlation_id: Some(operation.operation_id().clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{
        OperationErrorKind, OperationPayload, OperationRequest, SessionId, UserId,
    };
    use mockable::DefaultClock;
    use rstest::rstest;
    use serde_json::json;

    fn operation(kind: &str, payload: OperationPayload) -> Operation {
        let request = OperationRequest::new(
            OperationKind::parse(kind),
            UserId::new("alice").expect("valid user id"),
            payload,
        );
        Operation::accept(
            request,
            SessionId::new("session-1").expect("valid session id"),
            &DefaultClock,
        )
    }

    fn plan(kind: &str, payload: OperationPayload) -> Result<StoreCall, OperationError> {
        StoreCall::plan(&operation(kind, payload), &ActivityOptions::default())
    }

    #[test]
    fn save_stamps_operation_id_into_metadata() {
        let op = operation("save", OperationPayload::new("hello"));
        let call = StoreCall::plan(&op, &ActivityOptions::default()).expect("save should plan");

        let StoreCall::Add(request) = call else {
            panic!("save should map to an add");
        };
        assert_eq!(request.content, "hello");
        assert_eq!(
            request.metadata.get("operation_id"),
            Some(&json!(op.operation_id().as_str()))
        );
        assert!(!request.metadata.contains_key("graph_focused"));
    }

    #[rstest]
    #[case("save", "    indented code\n")]
    #[case("save_graph", "\tAlice knows Bob\n\n")]
    fn saved_content_keeps_its_whitespace(#[case] kind: &str, #[case] text: &str) {
        let call = plan(kind, OperationPayload::new(text)).expect("save should plan");

        let StoreCall::Add(request) = call else {
            panic!("save should map to an add");
        };
        assert_eq!(request.content, text);
    }

    #[test]
    fn graph_save_is_flagged() {
        let call = plan("save_graph", OperationPayload::new("Alice knows Bob"))
            .expect("graph save should plan");

        let StoreCall::Add(request) = call else {
            panic!("graph save should map to an add");
        };
        assert_eq!(request.metadata.get("graph_focused"), Some(&json!(true)));
    }

    #[rstest]
    #[case("search")]
    #[case("search_graph")]
    fn searches_use_default_limit(#[case] kind: &str) {
        let call = plan(kind, OperationPayload::new("coffee")).expect("search should plan");

        assert!(matches!(
            call,
            StoreCall::Search(SearchMemoryRequest { limit: 5, entity: None, .. })
        ));
    }

    #[test]
    fn search_honours_limit_metadata() {
        let call = plan("search", OperationPayload::new("coffee").with_entry("limit", 12))
            .expect("search should plan");

        assert!(matches!(call, StoreCall::Search(SearchMemoryRequest { limit: 12, .. })));
    }

    #[rstest]
    #[case(json!(0))]
    #[case(json!(-3))]
    #[case(json!("ten"))]
    fn invalid_limits_are_validation_errors(#[case] limit: serde_json::Value) {
        let error = plan("search", OperationPayload::new("coffee").with_entry("limit", limit))
            .expect_err("invalid limit should fail");

        assert_eq!(error.kind, OperationErrorKind::Validation);
    }

    #[test]
    fn entity_analysis_prefers_entity_name_metadata() {
        let call = plan(
            "analyze_entity",
            OperationPayload::new("ignored").with_entry("entity_name", "Bob"),
        )
        .expect("entity analysis should plan");

        let StoreCall::Search(request) = call else {
            panic!("entity analysis should map to a search");
        };
        assert_eq!(request.query, "Bob");
        assert_eq!(request.entity.as_deref(), Some("Bob"));
    }

    #[rstest]
    #[case("save", "")]
    #[case("search", "   ")]
    #[case("analyze_entity", "")]
    #[case("UNKNOWN", "hello")]
    fn malformed_operations_fail_validation(#[case] kind: &str, #[case] text: &str) {
        let error = plan(kind, OperationPayload::new(text)).expect_err("planning should fail");

        assert_eq!(error.kind, OperationErrorKind::Validation);
        assert_eq!(error.attempts, 0);
    }
}

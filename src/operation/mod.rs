//! Operation requests, accepted operations, and their results.
//!
//! These are the values that flow from the façade into a session, through
//! the activity executor, and back into the session's bounded history.

mod accepted;
mod error;
mod ids;
mod kind;
mod result;

pub use error::{OperationDomainError, ParseOperationTypeError};
pub use ids::{AgentId, OperationId, SessionId, UserId};
pub use kind::{OperationKind, OperationType};
pub use accepted::{Metadata, Operation, OperationPayload, OperationRequest};
pub use result::{OperationError, OperationErrorKind, OperationResult};

//! Activity execution against the external memory store.
//!
//! An activity is the unit of work that actually talks to the memory store:
//! it is time-bounded, retried on transient failures, and always resolves
//! to a well-formed [`crate::operation::OperationResult`]. The module
//! follows the crate's hexagonal layout:
//!
//! - Request shaping and retry policy in [`domain`]
//! - The memory store contract in [`ports`]
//! - An in-process store in [`adapters`]
//! - The executor in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

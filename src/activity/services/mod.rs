//! Activity execution services.

mod executor;

pub use executor::{ActivityExecutor, ActivityFailure};

//! Domain model for memory store activities.

mod plan;
mod policy;
mod request;

pub use plan::StoreCall;
pub use policy::ActivityOptions;
pub use request::{AddMemoryRequest, ListMemoriesRequest, SearchMemoryRequest, StoreHealthReport};

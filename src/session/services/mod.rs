//! Session services: the per-session machine, its handle and the registry.

mod error;
mod handle;
mod machine;
mod registry;

pub use error::SessionError;
pub use handle::SessionHandle;
pub use registry::SessionRegistry;

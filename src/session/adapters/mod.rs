//! Session journal adapters.

pub mod file;
pub mod memory;

pub use file::FileSessionJournal;
pub use memory::InMemorySessionJournal;

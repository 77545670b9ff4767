//! Session state store — durable dial cursor with optimistic concurrency.

pub mod libsql_backend;
pub mod memory;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use traits::{CursorSnapshot, SessionStore, WriteOutcome};

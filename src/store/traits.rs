//! `SessionStore` trait — the only mutable shared state in the system.

use async_trait::async_trait;

use crate::error::StoreError;

/// A cursor value together with the version token it was read at.
///
/// The version is an opaque monotonic counter; a later conditional write is
/// accepted only if the row's version still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSnapshot {
    /// Index of the next forwarding entry to try.
    pub cursor: u32,
    /// Version token for the conditional write.
    pub version: i64,
}

/// Outcome of a conditional cursor write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was accepted.
    Applied,
    /// Another leg advanced the cursor first; this write was dropped.
    Conflict,
}

/// Backend-agnostic access to the per-session dial cursor.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the cursor for `session`, creating the row with cursor 0 if it
    /// does not exist yet. Creation races resolve to a plain fetch.
    async fn get_cursor(&self, session: &str) -> Result<CursorSnapshot, StoreError>;

    /// Conditionally write a new cursor value. The write is accepted only if
    /// the row's version still equals `expected_version`; otherwise it is
    /// dropped and `Conflict` is returned. Conflicts are expected under
    /// concurrent legs and are not errors.
    async fn set_cursor(
        &self,
        session: &str,
        cursor: u32,
        expected_version: i64,
    ) -> Result<WriteOutcome, StoreError>;
}

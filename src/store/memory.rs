//! In-memory session store — same semantics as the libSQL backend.
//!
//! Used by tests and suitable for ephemeral single-process deployments where
//! losing the cursor on restart is acceptable.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::traits::{CursorSnapshot, SessionStore, WriteOutcome};

/// Mutex-guarded map of session name to (cursor, version).
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, CursorSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_cursor(&self, session: &str) -> Result<CursorSnapshot, StoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| StoreError::Query(format!("Lock poisoned: {e}")))?;
        let snap = sessions
            .entry(session.to_string())
            .or_insert(CursorSnapshot { cursor: 0, version: 0 });
        Ok(*snap)
    }

    async fn set_cursor(
        &self,
        session: &str,
        cursor: u32,
        expected_version: i64,
    ) -> Result<WriteOutcome, StoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| StoreError::Query(format!("Lock poisoned: {e}")))?;
        match sessions.get_mut(session) {
            Some(snap) if snap.version == expected_version => {
                snap.cursor = cursor;
                snap.version += 1;
                Ok(WriteOutcome::Applied)
            }
            _ => Ok(WriteOutcome::Conflict),
        }
    }
}

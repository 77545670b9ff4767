//! libSQL backend — async `SessionStore` over a local database file.
//!
//! The schema is created on open. `libsql::Connection` is `Send + Sync` and
//! safe for concurrent async use, so a single connection is shared.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::info;

use crate::error::StoreError;
use crate::store::traits::{CursorSnapshot, SessionStore, WriteOutcome};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS call_sessions (
    name       TEXT PRIMARY KEY,
    cursor     INTEGER NOT NULL DEFAULT 0,
    version    INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT
)";

/// libSQL session store.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and ensure the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create store directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_db(db).await?;
        info!(path = %path.display(), "Session store opened");
        Ok(store)
    }

    /// Create an in-memory store (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;
        Self::from_db(db).await
    }

    async fn from_db(db: Database) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;
        conn.execute(SCHEMA, ())
            .await
            .map_err(|e| StoreError::Query(format!("Failed to create schema: {e}")))?;
        Ok(Self { db: Arc::new(db), conn })
    }
}

#[async_trait]
impl SessionStore for LibSqlStore {
    async fn get_cursor(&self, session: &str) -> Result<CursorSnapshot, StoreError> {
        // INSERT OR IGNORE tolerates a creation race between concurrent
        // first legs: the loser falls through to the SELECT.
        self.conn
            .execute(
                "INSERT OR IGNORE INTO call_sessions (name, cursor, version, updated_at)
                 VALUES (?1, 0, 0, ?2)",
                params![session, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to create session row: {e}")))?;

        let mut rows = self
            .conn
            .query(
                "SELECT cursor, version FROM call_sessions WHERE name = ?1",
                params![session],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to fetch session: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read session row: {e}")))?
            .ok_or_else(|| StoreError::MissingSession {
                session: session.to_string(),
            })?;

        let cursor: i64 = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("Bad cursor column: {e}")))?;
        let version: i64 = row
            .get(1)
            .map_err(|e| StoreError::Query(format!("Bad version column: {e}")))?;

        Ok(CursorSnapshot {
            cursor: cursor.max(0) as u32,
            version,
        })
    }

    async fn set_cursor(
        &self,
        session: &str,
        cursor: u32,
        expected_version: i64,
    ) -> Result<WriteOutcome, StoreError> {
        let affected = self
            .conn
            .execute(
                "UPDATE call_sessions
                 SET cursor = ?2, version = version + 1, updated_at = ?3
                 WHERE name = ?1 AND version = ?4",
                params![session, cursor as i64, Utc::now().to_rfc3339(), expected_version],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to write cursor: {e}")))?;

        if affected == 0 {
            Ok(WriteOutcome::Conflict)
        } else {
            Ok(WriteOutcome::Applied)
        }
    }
}

//! LibSQL document store implementation
//!
//! Stores every collection in one `documents` table as JSON text keyed by
//! `(collection, id)`, and counters in a `counters` table. Counter increments
//! run inside an IMMEDIATE transaction so concurrent allocators serialize on
//! the write lock instead of reading the same value.

use crate::error::{MshError, Result};
use crate::storage::{Document, DocumentStore, Filter};
use crate::types::MAX_SEQUENCE;
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Builder, Connection, Database, TransactionBehavior};
use tracing::{debug, info};

/// Schema applied on every open; statements are idempotent
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY NOT NULL,
    value INTEGER NOT NULL CHECK (value >= 0)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

/// Milliseconds a connection waits on a locked database before failing
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// Remote database (Turso Cloud)
    Remote { url: String, token: String },
}

/// LibSQL-backed document store
pub struct LibsqlStore {
    db: Database,
    mode: ConnectionMode,
}

impl LibsqlStore {
    /// Validate a local database file before opening
    ///
    /// * `Ok(true)` if the file exists and carries the SQLite header
    /// * `Ok(false)` if it does not exist and `must_exist` is false
    fn validate_database_file(db_path: &str, must_exist: bool) -> Result<bool> {
        let path = std::path::Path::new(db_path);

        if !path.exists() {
            if must_exist {
                return Err(MshError::Database(format!(
                    "Database file not found at '{}'. Run 'msh3 init' first or check MSH3_DB_PATH.",
                    db_path
                )));
            }
            return Ok(false);
        }

        let bytes = std::fs::read(path).map_err(|e| {
            MshError::Database(format!("Cannot read database file at '{}': {}", db_path, e))
        })?;

        // Empty files are valid: SQLite writes the header on first use
        if !bytes.is_empty() && (bytes.len() < 16 || &bytes[0..16] != b"SQLite format 3\0") {
            return Err(MshError::Database(format!(
                "Database file at '{}' is corrupted or not a SQLite database.",
                db_path
            )));
        }

        debug!("Database file validation passed: {}", db_path);
        Ok(true)
    }

    /// Open a store
    ///
    /// `create_if_missing` controls whether a missing local file is an error
    /// (normal commands) or gets created (`init`, imports, tests).
    pub async fn new_with_validation(mode: ConnectionMode, create_if_missing: bool) -> Result<Self> {
        info!(
            "Connecting to LibSQL database: {:?} (create_if_missing: {})",
            mode, create_if_missing
        );

        let db = match &mode {
            ConnectionMode::Local(path) => {
                let exists = Self::validate_database_file(path, !create_if_missing)?;
                if create_if_missing && !exists {
                    if let Some(parent) = std::path::Path::new(path).parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent).map_err(|e| {
                                MshError::Database(format!(
                                    "Failed to create database directory {}: {}",
                                    parent.display(),
                                    e
                                ))
                            })?;
                        }
                    }
                }

                Builder::new_local(path).build().await.map_err(|e| {
                    MshError::Database(format!("Failed to create local database: {}", e))
                })?
            }
            ConnectionMode::Remote { url, token } => {
                Builder::new_remote(url.clone(), token.clone())
                    .build()
                    .await
                    .map_err(|e| {
                        MshError::Database(format!("Failed to create remote database: {}", e))
                    })?
            }
        };

        let store = Self { db, mode };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an existing store (errors if a local file is missing)
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        Self::new_with_validation(mode, false).await
    }

    /// Create from string path
    ///
    /// - `libsql://...` → Remote (token from `token` or `MSH3_AUTH_TOKEN`)
    /// - anything else → Local file path
    pub async fn from_path(
        database_url: &str,
        token: Option<String>,
        create_if_missing: bool,
    ) -> Result<Self> {
        let mode = if database_url.starts_with("libsql://") {
            let token = token
                .or_else(|| std::env::var("MSH3_AUTH_TOKEN").ok())
                .ok_or_else(|| MshError::Other("MSH3_AUTH_TOKEN not found".into()))?;
            ConnectionMode::Remote {
                url: database_url.to_string(),
                token,
            }
        } else {
            ConnectionMode::Local(database_url.to_string())
        };

        Self::new_with_validation(mode, create_if_missing).await
    }

    pub fn mode(&self) -> &ConnectionMode {
        &self.mode
    }

    async fn run_migrations(&self) -> Result<()> {
        debug!("Applying document store schema");
        let conn = self.get_conn().await?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| MshError::Database(format!("Failed to apply schema: {}", e)))?;
        Ok(())
    }

    /// Get a connection with the busy timeout applied
    async fn get_conn(&self) -> Result<Connection> {
        let conn = self
            .db
            .connect()
            .map_err(|e| MshError::Database(format!("Failed to get connection: {}", e)))?;
        if matches!(self.mode, ConnectionMode::Local(_)) {
            conn.query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS), params![])
                .await?;
        }
        Ok(conn)
    }

    fn row_to_document(row: &libsql::Row) -> Result<Document> {
        let id: String = row.get(0)?;
        let raw: String = row.get(1)?;
        let data = serde_json::from_str(&raw)?;
        Ok(Document { id, data })
    }

    async fn read_counter(conn: &Connection, name: &str) -> Result<Option<u64>> {
        let mut rows = conn
            .query(
                "SELECT value FROM counters WHERE name = ?1",
                params![name.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => {
                let value: i64 = row.get(0)?;
                Ok(Some(value.max(0) as u64))
            }
            None => Ok(None),
        }
    }
}

fn is_lock_error(err: &libsql::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("locked") || msg.contains("busy")
}

#[async_trait]
impl DocumentStore for LibsqlStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.to_string(), id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_document(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id",
                params![collection.to_string()],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(Self::row_to_document(&row)?);
        }
        debug!("Listed {} documents from {}", documents.len(), collection);
        Ok(documents)
    }

    async fn set(&self, collection: &str, document: &Document) -> Result<()> {
        debug!("Writing {}/{}", collection, document.id);
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![
                collection.to_string(),
                document.id.clone(),
                serde_json::to_string(&document.data)?,
                Utc::now().to_rfc3339()
            ],
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        debug!("Deleting {}/{}", collection, id);
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.to_string(), id.to_string()],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        // Conditions are evaluated on the decoded JSON after the collection scan
        let documents = self.list(collection).await?;
        Ok(documents
            .into_iter()
            .filter(|doc| filter.matches(&doc.data))
            .collect())
    }

    async fn get_counter(&self, name: &str) -> Result<Option<u64>> {
        let conn = self.get_conn().await?;
        Self::read_counter(&conn, name).await
    }

    async fn set_counter(&self, name: &str, value: u64) -> Result<()> {
        let value = i64::try_from(value).map_err(|_| {
            MshError::Database(format!(
                "counter {} value {} exceeds {}",
                name, value, MAX_SEQUENCE
            ))
        })?;
        debug!("Setting counter {} = {}", name, value);
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO counters (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name.to_string(), value],
        )
        .await?;
        Ok(())
    }

    async fn increment_counter(&self, name: &str) -> Result<u64> {
        let conn = self.get_conn().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| {
                if is_lock_error(&e) {
                    MshError::TransactionConflict(e.to_string())
                } else {
                    MshError::from(e)
                }
            })?;

        // Checked in Rust: SQLite turns an overflowing `value + 1` into a REAL
        let current = Self::read_counter(&tx, name).await?.unwrap_or(0);
        let next = current
            .checked_add(1)
            .filter(|n| *n <= MAX_SEQUENCE)
            .ok_or_else(|| MshError::Database(format!("counter {} exhausted at {}", name, current)))?;

        tx.execute(
            "INSERT INTO counters (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name.to_string(), next as i64],
        )
        .await?;

        tx.commit().await.map_err(|e| {
            if is_lock_error(&e) {
                MshError::TransactionConflict(e.to_string())
            } else {
                MshError::from(e)
            }
        })?;

        debug!("Counter {} advanced to {}", name, next);
        Ok(next)
    }
}

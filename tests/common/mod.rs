//! Common test utilities and helpers

#![allow(dead_code)]

use msh3_core::storage::records::ASSESSMENTS;
use msh3_core::{ConnectionMode, Document, DocumentStore, LibsqlStore, MemoryStore, Records};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

/// Create a libSQL store in a temporary directory
///
/// Uses a file rather than `:memory:` because libSQL gives every connection
/// its own in-memory database. Keep the `TempDir` alive for the test.
pub async fn create_test_libsql() -> (TempDir, Arc<LibsqlStore>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("msh3_test.db");
    let store = LibsqlStore::new_with_validation(
        ConnectionMode::Local(path.to_string_lossy().to_string()),
        true, // create_if_missing - required for test databases
    )
    .await
    .expect("Failed to create test storage");
    (dir, Arc::new(store))
}

pub fn create_memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

pub fn records(store: &Arc<dyn DocumentStore>) -> Records {
    Records::new(Arc::clone(store))
}

/// Write bare documents carrying only an `msh_id`, as a direct import would
pub async fn seed_msh_ids(store: &dyn DocumentStore, sequences: &[u64]) {
    for n in sequences {
        store
            .set(
                ASSESSMENTS,
                &Document::new(format!("seed-{}", n), json!({ "msh_id": format!("MSH{}", n) })),
            )
            .await
            .expect("Failed to seed document");
    }
}

//! In-process document store
//!
//! Backs tests, dry runs and `--db-path :memory:`. Counter increments run
//! under the counter lock, which makes them atomic across tasks.

use crate::error::{MshError, Result};
use crate::storage::{Document, DocumentStore, Filter};
use crate::types::MAX_SEQUENCE;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type Collection = BTreeMap<String, Value>;

/// Memory-resident store
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set(&self, collection: &str, document: &Document) -> Result<()> {
        debug!("Writing {}/{}", collection, document.id);
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document.data.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        debug!("Deleting {}/{}", collection, id);
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|c| c.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, data)| filter.matches(data))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_counter(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.counters.lock().await.get(name).copied())
    }

    async fn set_counter(&self, name: &str, value: u64) -> Result<()> {
        if value > MAX_SEQUENCE {
            return Err(MshError::Database(format!(
                "counter {} value {} exceeds {}",
                name, value, MAX_SEQUENCE
            )));
        }
        debug!("Setting counter {} = {}", name, value);
        self.counters.lock().await.insert(name.to_string(), value);
        Ok(())
    }

    async fn increment_counter(&self, name: &str) -> Result<u64> {
        let mut counters = self.counters.lock().await;
        let current = counters.get(name).copied().unwrap_or(0);
        let next = current
            .checked_add(1)
            .filter(|n| *n <= MAX_SEQUENCE)
            .ok_or_else(|| MshError::Database(format!("counter {} exhausted at {}", name, current)))?;
        counters.insert(name.to_string(), next);
        Ok(next)
    }
}

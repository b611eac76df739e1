//! Storage layer for the MSH³ assessment system
//!
//! The external store is treated as an opaque document store: named
//! collections of JSON documents keyed by id, plus named integer counters
//! with an atomic increment-and-fetch. Typed access and schema validation
//! live in [`records`].

pub mod libsql;
pub mod memory;
pub mod records;
pub mod test_utils;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A stored document: id plus raw JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Field-equality filter over dotted paths (e.g. `cycle.year`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when every condition holds; missing fields never match
    pub fn matches(&self, data: &Value) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            let pointer = format!("/{}", field.replace('.', "/"));
            data.pointer(&pointer) == Some(expected)
        })
    }
}

/// Storage backend trait defining the primitives the core relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document; `None` when absent
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Read every document in a collection
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Write or overwrite a document
    async fn set(&self, collection: &str, document: &Document) -> Result<()>;

    /// Delete by id; returns whether a document was removed
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Documents matching every condition of `filter`
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Current counter value; `None` when the counter was never written
    async fn get_counter(&self, name: &str) -> Result<Option<u64>>;

    /// Overwrite a counter (administrative reset/sync only)
    async fn set_counter(&self, name: &str, value: u64) -> Result<()>;

    /// Atomically read (default 0), add one, write back and return the new value
    async fn increment_counter(&self, name: &str) -> Result<u64>;
}

//! In-memory document store for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::marketplace::UserId;
use crate::traits::{BatchWrite, Datastore, FieldWrite};

/// Create a test user id for mock purposes.
pub fn make_test_user(id: u8) -> UserId {
    UserId::new(format!("user-{id}"))
}

/// Types of failures that can be simulated.
#[derive(Debug, Clone)]
pub enum MemoryFailure {
    /// Fail all operations.
    All,
    /// Fail only read operations.
    Reads,
    /// Fail only write operations.
    Writes,
    /// Fail any operation touching a specific collection.
    OnCollection(String),
}

#[derive(Debug)]
struct MemoryInner {
    /// Documents per collection, keyed by id. BTreeMap keeps query results
    /// deterministic across runs.
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    /// Whether to simulate failures.
    fail_mode: RwLock<Option<MemoryFailure>>,
}

/// In-memory datastore for testing.
///
/// All clones share the same underlying storage, so multiple components
/// (or simulated client devices) wired to clones observe one consistent
/// set of documents.
#[derive(Debug, Clone)]
pub struct MemoryDatastore {
    inner: Arc<MemoryInner>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                collections: RwLock::new(HashMap::new()),
                fail_mode: RwLock::new(None),
            }),
        }
    }

    /// Set failure mode for testing error handling.
    pub async fn set_fail_mode(&self, mode: Option<MemoryFailure>) {
        *self.inner.fail_mode.write().await = mode;
    }

    /// Check if the current operation should fail.
    async fn should_fail(&self, is_write: bool, collection: &str) -> bool {
        let mode = self.inner.fail_mode.read().await;
        match &*mode {
            None => false,
            Some(MemoryFailure::All) => true,
            Some(MemoryFailure::Reads) => !is_write,
            Some(MemoryFailure::Writes) => is_write,
            Some(MemoryFailure::OnCollection(name)) => collection == name,
        }
    }

    /// Number of documents in a collection (for test assertions).
    pub async fn document_count(&self, collection: &str) -> usize {
        let collections = self.inner.collections.read().await;
        collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Check if a specific document exists.
    pub async fn has_document(&self, collection: &str, id: &str) -> bool {
        let collections = self.inner.collections.read().await;
        collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id))
    }

    /// Snapshot of one collection (for test assertions).
    pub async fn snapshot(&self, collection: &str) -> BTreeMap<String, Value> {
        let collections = self.inner.collections.read().await;
        collections.get(collection).cloned().unwrap_or_default()
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge one field into a document, creating intermediate objects along
/// the dot-separated path.
fn apply_field(doc: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = doc;

    loop {
        let segment = segments.next().expect("field path must not be empty");
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().expect("just coerced to object");

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Read a field addressed by a dot-separated path.
fn read_field<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        if self.should_fail(false, collection).await {
            return Err(anyhow!("MemoryDatastore: simulated read failure"));
        }

        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn put(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        if self.should_fail(true, collection).await {
            return Err(anyhow!("MemoryDatastore: simulated write failure"));
        }

        let mut collections = self.inner.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Vec<FieldWrite>) -> Result<()> {
        if self.should_fail(true, collection).await {
            return Err(anyhow!("MemoryDatastore: simulated update failure"));
        }

        let mut collections = self.inner.collections.write().await;
        let doc = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        for field in fields {
            apply_field(doc, &field.path, field.value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if self.should_fail(true, collection).await {
            return Err(anyhow!("MemoryDatastore: simulated delete failure"));
        }

        let mut collections = self.inner.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>> {
        if self.should_fail(false, collection).await {
            return Err(anyhow!("MemoryDatastore: simulated query failure"));
        }

        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| read_field(doc, field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn batch(&self, writes: Vec<BatchWrite>) -> Result<()> {
        // Check every write's failure verdict before touching storage so a
        // failing batch leaves nothing applied.
        for write in &writes {
            if self.should_fail(true, write.collection).await {
                return Err(anyhow!("MemoryDatastore: simulated batch failure"));
            }
        }

        let mut collections = self.inner.collections.write().await;
        for write in writes {
            let doc = collections
                .entry(write.collection.to_string())
                .or_default()
                .entry(write.id)
                .or_insert_with(|| Value::Object(Map::new()));
            for field in write.fields {
                apply_field(doc, &field.path, field.value);
            }
        }
        Ok(())
    }
}

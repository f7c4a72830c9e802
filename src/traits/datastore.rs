//! Document-store abstraction for testable persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A single field assignment inside a document update.
///
/// `path` addresses a field with `.`-separated segments:
/// `"finalized.user-1"` targets the `user-1` key of the `finalized` map.
#[derive(Debug, Clone)]
pub struct FieldWrite {
    pub path: String,
    pub value: Value,
}

impl FieldWrite {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// One document's worth of field writes inside an atomic batch.
#[derive(Debug, Clone)]
pub struct BatchWrite {
    pub collection: &'static str,
    pub id: String,
    pub fields: Vec<FieldWrite>,
}

/// Abstraction over the persistent document store.
///
/// This trait enables testing of persistence-dependent code without a
/// running database. Documents are JSON-shaped values keyed by
/// (collection, id).
#[async_trait]
pub trait Datastore: Send + Sync + Clone {
    /// Fetch a document.
    ///
    /// Returns `None` if no document exists under this id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Store a document, replacing any existing one.
    async fn put(&self, collection: &str, id: &str, doc: Value) -> Result<()>;

    /// Merge the given fields into a document, creating it when absent.
    ///
    /// Each field is addressed independently, so concurrent updates to
    /// different keys of the same map never clobber each other.
    async fn update(&self, collection: &str, id: &str, fields: Vec<FieldWrite>) -> Result<()>;

    /// Remove a document. Removing an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// All documents whose `field` equals `value`.
    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>>;

    /// Apply every write as one atomic unit: either all land or none do.
    async fn batch(&self, writes: Vec<BatchWrite>) -> Result<()>;
}

/// Serialize a domain type into its document form.
pub fn to_doc<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to serialize document")
}

/// Deserialize a document back into its domain type.
pub fn from_doc<T: DeserializeOwned>(doc: Value) -> Result<T> {
    serde_json::from_value(doc).context("failed to deserialize document")
}

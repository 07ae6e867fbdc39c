//! In-memory [`DocumentStore`] for tests and offline runs.
//!
//! Collections are plain `Vec`s behind `std::sync::RwLock`. Random sampling
//! draws its randomness from v4 UUIDs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::value::{get_path, Document};
use super::{CollectionStats, DocumentStore, Filter};
use crate::error::Result;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for fixtures. Non-object values are
    /// skipped.
    pub fn with_collection(self, name: &str, docs: Vec<Value>) -> Self {
        self.insert_many(name, docs);
        self
    }

    pub fn insert_many(&self, name: &str, docs: Vec<Value>) {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let target = collections.entry(name.to_string()).or_default();
        target.extend(docs.into_iter().filter_map(|d| match d {
            Value::Object(map) => Some(map),
            _ => None,
        }));
    }

    fn with_docs<T>(&self, collection: &str, f: impl FnOnce(&[Document]) -> T) -> T {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        f(collections.get(collection).map(Vec::as_slice).unwrap_or(&[]))
    }
}

fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Exists(field) => get_path(doc, field).is_some_and(|v| !v.is_null()),
        Filter::Eq(field, expected) => get_path(doc, field).is_some_and(|v| contains(v, expected)),
        Filter::In(field, options) => {
            get_path(doc, field).is_some_and(|v| options.iter().any(|o| contains(v, o)))
        }
    }
}

/// Equality, with arrays matching any element.
fn contains(value: &Value, expected: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|i| i == expected),
        other => other == expected,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_collection_names(&self) -> Result<Vec<String>> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(collections.keys().cloned().collect())
    }

    async fn count_documents(&self, collection: &str) -> Result<u64> {
        Ok(self.with_docs(collection, |docs| docs.len() as u64))
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        Ok(self.with_docs(collection, |docs| {
            let size: u64 = docs
                .iter()
                .map(|d| serde_json::to_string(d).map(|s| s.len() as u64).unwrap_or(0))
                .sum();
            CollectionStats {
                count: docs.len() as u64,
                avg_obj_size: (!docs.is_empty()).then(|| size as f64 / docs.len() as f64),
                size: Some(size),
            }
        }))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>> {
        Ok(self.with_docs(collection, |docs| {
            docs.iter()
                .filter(|d| matches(d, filter))
                .skip(skip as usize)
                .take(limit as usize)
                .cloned()
                .collect()
        }))
    }

    async fn sample(&self, collection: &str, size: u64) -> Result<Vec<Document>> {
        Ok(self.with_docs(collection, |docs| {
            let mut keyed: Vec<(u128, &Document)> = docs
                .iter()
                .map(|d| (uuid::Uuid::new_v4().as_u128(), d))
                .collect();
            keyed.sort_by_key(|(k, _)| *k);
            keyed
                .into_iter()
                .take(size as usize)
                .map(|(_, d)| d.clone())
                .collect()
        }))
    }

    async fn distinct(&self, collection: &str, field: &str, filter: &Filter) -> Result<Vec<Value>> {
        Ok(self.with_docs(collection, |docs| {
            let mut out: Vec<Value> = Vec::new();
            for doc in docs.iter().filter(|d| matches(d, filter)) {
                let values = match get_path(doc, field) {
                    Some(Value::Array(items)) => items.clone(),
                    Some(value) => vec![value.clone()],
                    None => continue,
                };
                for value in values {
                    if !out.contains(&value) {
                        out.push(value);
                    }
                }
            }
            out
        }))
    }
}

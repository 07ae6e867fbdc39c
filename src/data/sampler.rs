//
//  sampler.rs
//  RouteLens
//
//  Collection listing, sampling and schema inference over the live store.
//

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::value::{
    display_name, document_id, is_leaf, object_id_hex, object_id_value, summary, type_name,
    Document, ID_FIELD,
};
use super::{Connection, DocumentStore, Filter};
use crate::error::Result;

/// Below this many documents, skip-based sampling is cheap enough.
pub const SKIP_SAMPLING_THRESHOLD: u64 = 100;
/// Nesting depth the schema walk descends to.
pub const MAX_SCHEMA_DEPTH: usize = 5;
pub const MAX_EXAMPLES: usize = 3;

/// A real document, trimmed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub data: Value,
    pub display_name: String,
    pub summary: String,
}

impl SampleDocument {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: document_id(doc),
            data: Value::Object(doc.clone()),
            display_name: display_name(doc),
            summary: summary(doc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub name: String,
    pub count: u64,
    pub avg_size: Option<f64>,
}

/// Inferred shape of one field path (`a`, `a.b`, `tags[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    /// Sorted set of observed type labels.
    pub types: Vec<String>,
    /// Percentage of sampled documents holding a non-null value.
    pub frequency: f64,
    pub examples: Vec<Value>,
}

impl SchemaField {
    /// The first non-null type, or `null`.
    pub fn primary_type(&self) -> &str {
        self.types
            .iter()
            .map(String::as_str)
            .find(|t| *t != "null")
            .unwrap_or("null")
    }

    /// Top-level field (no `.` or `[]` in the path).
    pub fn is_top_level(&self) -> bool {
        !self.name.contains('.') && !self.name.contains("[]")
    }
}

/// An identifier from a related collection, and whether anything in the
/// source collection actually points at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedId {
    pub id: String,
    pub referenced: bool,
    pub display_name: Option<String>,
}

/// Read-only access to collections through the shared [`Connection`].
#[derive(Debug, Clone)]
pub struct DataSampler {
    connection: Arc<Connection>,
}

impl DataSampler {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn is_available(&self) -> bool {
        self.connection.is_available()
    }

    /// Run `op` against the attached store; unavailable or failing stores
    /// produce `T::default()` and a warning.
    async fn degrade<T, F, Fut>(&self, what: &str, op: F) -> T
    where
        T: Default,
        F: FnOnce(Arc<dyn DocumentStore>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let Some(store) = self.connection.store() else {
            debug!(operation = what, "document store unavailable");
            return T::default();
        };
        match op(store).await {
            Ok(value) => value,
            Err(e) => {
                warn!(operation = what, error = %e, "document store operation failed");
                T::default()
            }
        }
    }

    /// User collection names, sorted; `system.*` is hidden.
    pub async fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .degrade("list_collections", |store| async move {
                store.list_collection_names().await
            })
            .await;
        names.retain(|n| !n.starts_with("system."));
        names.sort();
        names
    }

    /// Every collection with its count and average document size.
    pub async fn get_collections_info(&self) -> Vec<CollectionInfo> {
        let Some(store) = self.connection.store() else {
            return Vec::new();
        };
        let mut infos = Vec::new();
        for name in self.list_collections().await {
            let info = match store.collection_stats(&name).await {
                Ok(stats) => CollectionInfo {
                    name,
                    count: stats.count,
                    avg_size: stats.avg_obj_size,
                },
                Err(e) => {
                    debug!(collection = %name, error = %e, "stats unavailable, counting instead");
                    let count = store.count_documents(&name).await.unwrap_or_else(|e| {
                        warn!(collection = %name, error = %e, "count failed");
                        0
                    });
                    CollectionInfo {
                        name,
                        count,
                        avg_size: None,
                    }
                }
            };
            infos.push(info);
        }
        infos
    }

    /// Up to `limit` documents chosen by the sampling policy.
    pub async fn get_sample_documents(&self, collection: &str, limit: usize) -> Vec<SampleDocument> {
        self.sample_raw(collection, limit)
            .await
            .iter()
            .map(SampleDocument::from_document)
            .collect()
    }

    /// Sampling policy:
    ///
    /// - `count <= limit`: every document
    /// - `count < 100`: one random window of `limit` documents
    /// - otherwise: the store's random sample
    pub async fn sample_raw(&self, collection: &str, limit: usize) -> Vec<Document> {
        let limit = limit as u64;
        if limit == 0 {
            return Vec::new();
        }
        self.degrade("sample", |store| async move {
            let total = store.count_documents(collection).await?;
            if total == 0 {
                return Ok(Vec::new());
            }
            if total <= limit {
                return store.find(collection, &Filter::All, 0, total).await;
            }
            if total < SKIP_SAMPLING_THRESHOLD {
                let skip = random_below(total - limit + 1);
                return store.find(collection, &Filter::All, skip, limit).await;
            }
            store.sample(collection, limit).await
        })
        .await
    }

    /// Per-field types, presence and examples over a sample, most frequent
    /// first.
    pub async fn infer_schema(&self, collection: &str, sample_size: usize) -> Vec<SchemaField> {
        let docs = self.sample_raw(collection, sample_size).await;
        schema_from_documents(&docs)
    }

    /// Up to `limit` distinct non-null values of one field.
    pub async fn get_field_samples(&self, collection: &str, field: &str, limit: usize) -> Vec<Value> {
        let mut values: Vec<Value> = self
            .degrade("field_samples", |store| async move {
                store
                    .distinct(collection, field, &Filter::Exists(field.to_string()))
                    .await
            })
            .await;
        values.retain(|v| !v.is_null());
        values.truncate(limit);
        values
    }

    /// Ids in `related_collection` that `collection.foreign_key` actually
    /// references, padded with arbitrary ids from `related_collection` when
    /// fewer than `limit` are referenced.
    pub async fn find_valid_object_ids(
        &self,
        collection: &str,
        foreign_key: &str,
        related_collection: &str,
        limit: usize,
    ) -> Vec<ReferencedId> {
        if limit == 0 {
            return Vec::new();
        }
        self.degrade("find_valid_object_ids", |store| async move {
            let mut found: Vec<ReferencedId> = Vec::new();

            let referenced: BTreeSet<String> = store
                .distinct(collection, foreign_key, &Filter::Exists(foreign_key.to_string()))
                .await?
                .iter()
                .filter_map(object_id_hex)
                .collect();

            if !referenced.is_empty() {
                // Match both ObjectId and string-encoded ids.
                let candidates: Vec<Value> = referenced
                    .iter()
                    .flat_map(|hex| [object_id_value(hex), Value::String(hex.clone())])
                    .collect();
                let docs = store
                    .find(
                        related_collection,
                        &Filter::In(ID_FIELD.to_string(), candidates),
                        0,
                        limit as u64,
                    )
                    .await?;
                found.extend(docs.iter().map(|d| ReferencedId {
                    id: document_id(d),
                    referenced: true,
                    display_name: Some(display_name(d)),
                }));
            }

            if found.len() < limit {
                let padding = store
                    .find(related_collection, &Filter::All, 0, (limit * 2) as u64)
                    .await?;
                for doc in &padding {
                    if found.len() >= limit {
                        break;
                    }
                    let id = document_id(doc);
                    if id.is_empty() || found.iter().any(|f| f.id == id) {
                        continue;
                    }
                    found.push(ReferencedId {
                        id,
                        referenced: false,
                        display_name: Some(display_name(doc)),
                    });
                }
            }

            Ok(found)
        })
        .await
    }
}

/// Uniform-ish integer in `0..bound`.
fn random_below(bound: u64) -> u64 {
    if bound <= 1 {
        return 0;
    }
    (uuid::Uuid::new_v4().as_u128() % u128::from(bound)) as u64
}

#[derive(Default)]
struct FieldAccumulator {
    types: BTreeSet<String>,
    present: usize,
    examples: Vec<Value>,
}

/// Schema over an already-fetched set of documents.
pub fn schema_from_documents(docs: &[Document]) -> Vec<SchemaField> {
    let mut fields: BTreeMap<String, FieldAccumulator> = BTreeMap::new();

    for doc in docs {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for (key, value) in doc {
            walk_value(key, value, 0, &mut fields, &mut seen);
        }
        for path in seen {
            if let Some(acc) = fields.get_mut(&path) {
                acc.present += 1;
            }
        }
    }

    let total = docs.len().max(1) as f64;
    let mut schema: Vec<SchemaField> = fields
        .into_iter()
        .map(|(name, acc)| SchemaField {
            name,
            types: acc.types.into_iter().collect(),
            frequency: acc.present as f64 / total * 100.0,
            examples: acc.examples,
        })
        .collect();
    // Stable: equal frequencies stay in path order.
    schema.sort_by(|a, b| b.frequency.total_cmp(&a.frequency));
    schema
}

fn walk_value(
    path: &str,
    value: &Value,
    depth: usize,
    fields: &mut BTreeMap<String, FieldAccumulator>,
    seen: &mut BTreeSet<String>,
) {
    let acc = fields.entry(path.to_string()).or_default();
    acc.types.insert(type_name(value).to_string());
    if value.is_null() {
        return;
    }
    seen.insert(path.to_string());
    if is_leaf(value) && acc.examples.len() < MAX_EXAMPLES && !acc.examples.contains(value) {
        acc.examples.push(value.clone());
    }
    if depth >= MAX_SCHEMA_DEPTH {
        return;
    }

    match value {
        Value::Object(map) if !is_leaf(value) => {
            for (key, child) in map {
                walk_value(&format!("{path}.{key}"), child, depth + 1, fields, seen);
            }
        }
        Value::Array(items) => {
            let element_path = format!("{path}[]");
            for item in items {
                walk_value(&element_path, item, depth + 1, fields, seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use serde_json::json;

    async fn sampler_with(collections: Vec<(&str, Vec<Value>)>) -> DataSampler {
        let store = MemoryStore::new();
        for (name, docs) in collections {
            store.insert_many(name, docs);
        }
        let connection = Arc::new(Connection::disconnected());
        assert!(connection.attach(Arc::new(store)).await);
        DataSampler::new(connection)
    }

    fn numbered(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "_id": i, "n": i })).collect()
    }

    #[tokio::test]
    async fn test_sampling_policy_boundaries() {
        let limit = 10;
        let sampler = sampler_with(vec![
            ("exact", numbered(limit)),
            ("fewer", numbered(limit - 1)),
            ("small", numbered(50)),
            ("large", numbered(150)),
            ("empty", Vec::new()),
        ])
        .await;

        assert_eq!(sampler.get_sample_documents("exact", limit).await.len(), limit);
        assert_eq!(sampler.get_sample_documents("fewer", limit).await.len(), limit - 1);
        assert_eq!(sampler.get_sample_documents("small", limit).await.len(), limit);
        assert_eq!(sampler.get_sample_documents("large", limit).await.len(), limit);
        assert!(sampler.get_sample_documents("empty", limit).await.is_empty());
        assert!(sampler.get_sample_documents("missing", limit).await.is_empty());
    }

    #[tokio::test]
    async fn test_skip_window_is_contiguous() {
        let sampler = sampler_with(vec![("small", numbered(50))]).await;
        let docs = sampler.sample_raw("small", 5).await;
        let ns: Vec<i64> = docs.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        for pair in ns.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }

    #[tokio::test]
    async fn test_unavailable_connection_degrades() {
        let sampler = DataSampler::new(Arc::new(Connection::disconnected()));
        assert!(sampler.list_collections().await.is_empty());
        assert!(sampler.get_collections_info().await.is_empty());
        assert!(sampler.get_sample_documents("users", 5).await.is_empty());
        assert!(sampler.infer_schema("users", 5).await.is_empty());
        assert!(sampler.get_field_samples("users", "email", 5).await.is_empty());
        assert!(sampler
            .find_valid_object_ids("orders", "userId", "users", 5)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_infer_schema() {
        let sampler = sampler_with(vec![(
            "users",
            vec![
                json!({"_id": {"$oid": "64b000000000000000000001"}, "email": "a@x.io", "age": 30,
                       "address": {"city": "Oslo"}, "tags": ["x"], "createdAt": {"$date": "2024-01-01T00:00:00Z"}}),
                json!({"_id": {"$oid": "64b000000000000000000002"}, "email": "b@x.io", "age": null}),
            ],
        )])
        .await;

        let schema = sampler.infer_schema("users", 10).await;
        let field = |name: &str| schema.iter().find(|f| f.name == name).unwrap();

        assert_eq!(field("_id").types, vec!["ObjectId"]);
        assert_eq!(field("_id").frequency, 100.0);
        assert_eq!(field("email").examples.len(), 2);
        assert_eq!(field("age").types, vec!["null", "number"]);
        assert_eq!(field("age").frequency, 50.0);
        assert_eq!(field("age").primary_type(), "number");
        assert_eq!(field("address.city").types, vec!["string"]);
        assert!(!field("address.city").is_top_level());
        assert_eq!(field("tags[]").types, vec!["string"]);
        assert_eq!(field("createdAt").types, vec!["Date"]);

        let frequencies: Vec<f64> = schema.iter().map(|f| f.frequency).collect();
        assert!(frequencies.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_field_samples_and_collections() {
        let sampler = sampler_with(vec![
            ("users", vec![json!({"role": "admin"}), json!({"role": "user"}), json!({"role": null})]),
            ("system.views", vec![json!({})]),
        ])
        .await;
        assert_eq!(sampler.list_collections().await, vec!["users"]);
        let roles = sampler.get_field_samples("users", "role", 5).await;
        assert_eq!(roles, vec![json!("admin"), json!("user")]);

        let info = sampler.get_collections_info().await;
        assert_eq!(info[0].count, 3);
    }

    #[tokio::test]
    async fn test_find_valid_object_ids() {
        let sampler = sampler_with(vec![
            (
                "users",
                vec![
                    json!({"_id": {"$oid": "64b000000000000000000001"}, "name": "Ada"}),
                    json!({"_id": {"$oid": "64b000000000000000000002"}, "name": "Grace"}),
                    json!({"_id": {"$oid": "64b000000000000000000003"}, "name": "Linus"}),
                ],
            ),
            (
                "orders",
                vec![json!({"userId": {"$oid": "64b000000000000000000002"}})],
            ),
        ])
        .await;

        let ids = sampler
            .find_valid_object_ids("orders", "userId", "users", 2)
            .await;
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].id, "64b000000000000000000002");
        assert!(ids[0].referenced);
        assert_eq!(ids[0].display_name.as_deref(), Some("Grace"));
        assert!(!ids[1].referenced);
        assert_ne!(ids[1].id, ids[0].id);
    }
}

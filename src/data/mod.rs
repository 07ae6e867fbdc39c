//! Live document-store access.
//!
//! Everything here sits behind [`Connection`]: when no store is attached (or
//! the attached one stops answering), every public operation returns an
//! empty result and logs a warning, so prediction keeps working without a
//! database.
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`DocumentStore`] | Minimal async store interface (MongoDB, in-memory) |
//! | [`Connection`] | Owner-controlled handle to the one live store |
//! | [`DataSampler`] | Collection listing, sampling, schema inference |
//! | [`ObjectIdResolver`] | Real ids for reference fields |
//! | [`SchemaViewer`] | Per-field statistics and relation guesses |

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod object_id;
pub mod sampler;
pub mod schema;
pub mod value;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;

pub use memory::MemoryStore;
pub use object_id::{ObjectIdResolution, ObjectIdResolver, SuggestedId};
pub use sampler::{CollectionInfo, DataSampler, ReferencedId, SampleDocument, SchemaField};
pub use schema::{DetailedSchemaField, RelationInfo, SchemaViewer};
pub use value::Document;

/// Query shapes the sampler needs. Field names may be dotted paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Field present and not null.
    Exists(String),
    Eq(String, Value),
    In(String, Vec<Value>),
}

/// Size statistics for one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub count: u64,
    pub avg_obj_size: Option<f64>,
    pub size: Option<u64>,
}

/// A schema-less document store.
///
/// Documents cross this boundary as relaxed extended JSON.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Cheap round-trip used to decide availability.
    async fn ping(&self) -> Result<()>;

    async fn list_collection_names(&self) -> Result<Vec<String>>;

    async fn count_documents(&self, collection: &str) -> Result<u64>;

    /// May fail on stores without a stats command; callers fall back to
    /// [`count_documents`](DocumentStore::count_documents).
    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>>;

    /// `size` documents picked at random.
    async fn sample(&self, collection: &str, size: u64) -> Result<Vec<Document>>;

    /// Distinct values of `field` among matching documents; array values
    /// contribute their elements.
    async fn distinct(&self, collection: &str, field: &str, filter: &Filter) -> Result<Vec<Value>>;
}

/// The process's single live store, attached and detached by its owner.
///
/// Data-dependent components hold an `Arc<Connection>` and ask it for the
/// store on every call; nothing else keeps a store alive.
pub struct Connection {
    config: DatabaseConfig,
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
}

impl Connection {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            store: RwLock::new(None),
        }
    }

    /// A handle with nothing attached.
    pub fn disconnected() -> Self {
        Self::new(DatabaseConfig::default())
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Connect to the configured MongoDB deployment.
    ///
    /// Returns whether the store answered a ping within the configured
    /// timeout; a failure leaves the handle disconnected.
    #[cfg(feature = "mongodb")]
    pub async fn connect(&self) -> bool {
        match mongo::MongoStore::connect(&self.config).await {
            Ok(store) => self.attach(Arc::new(store)).await,
            Err(e) => {
                warn!(uri = %self.config.uri, error = %e, "document store connection failed");
                self.disconnect();
                false
            }
        }
    }

    #[cfg(not(feature = "mongodb"))]
    pub async fn connect(&self) -> bool {
        warn!("built without the `mongodb` feature, running without a document store");
        false
    }

    /// Attach an already-built store after checking it answers.
    pub async fn attach(&self, store: Arc<dyn DocumentStore>) -> bool {
        let reachable = tokio::time::timeout(self.config.timeout(), store.ping()).await;
        match reachable {
            Ok(Ok(())) => {
                *self.store.write().unwrap_or_else(|e| e.into_inner()) = Some(store);
                info!("document store connected");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "document store ping failed");
                self.disconnect();
                false
            }
            Err(_) => {
                warn!(timeout_ms = self.config.timeout_ms, "document store ping timed out");
                self.disconnect();
                false
            }
        }
    }

    pub fn disconnect(&self) {
        let previous = self.store.write().unwrap_or_else(|e| e.into_inner()).take();
        if previous.is_some() {
            info!("document store disconnected");
        }
    }

    pub fn is_available(&self) -> bool {
        self.store.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// The attached store, if any. The lock is released before returning,
    /// so callers can hold the `Arc` across awaits.
    pub fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        self.store.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("uri", &self.config.uri)
            .field("available", &self.is_available())
            .finish()
    }
}

//
//  mongo.rs
//  RouteLens
//
//  MongoDB-backed DocumentStore.
//

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document as BsonDocument};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use tracing::debug;

use super::value::Document;
use super::{CollectionStats, DocumentStore, Filter};
use crate::config::DatabaseConfig;
use crate::error::{Result, RouteLensError};

const FALLBACK_DATABASE: &str = "test";

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Build a client with the configured timeouts. No I/O happens until the
    /// first operation; [`Connection::attach`](super::Connection::attach)
    /// pings before handing the store out.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.connect_timeout = Some(config.timeout());
        options.server_selection_timeout = Some(config.timeout());
        options.app_name = Some("routelens".to_string());

        let client = Client::with_options(options)?;
        let database = match &config.database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(FALLBACK_DATABASE)),
        };
        debug!(database = %database.name(), "mongodb client ready");
        Ok(Self { database })
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection::<BsonDocument>(name)
    }
}

fn to_bson(value: &Value) -> Result<Bson> {
    Bson::try_from(value.clone()).map_err(|e| RouteLensError::Store(e.to_string()))
}

fn to_filter(filter: &Filter) -> Result<BsonDocument> {
    let mut out = BsonDocument::new();
    match filter {
        Filter::All => {}
        Filter::Exists(field) => {
            out.insert(field.as_str(), doc! { "$exists": true, "$ne": Bson::Null });
        }
        Filter::Eq(field, value) => {
            out.insert(field.as_str(), to_bson(value)?);
        }
        Filter::In(field, values) => {
            let values = values.iter().map(to_bson).collect::<Result<Vec<_>>>()?;
            out.insert(field.as_str(), doc! { "$in": values });
        }
    }
    Ok(out)
}

fn to_json(document: BsonDocument) -> Document {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// `collStats` numbers come back as int32, int64 or double.
fn number(stats: &BsonDocument, key: &str) -> Option<f64> {
    match stats.get(key)? {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self.database.list_collection_names().await?)
    }

    async fn count_documents(&self, collection: &str) -> Result<u64> {
        Ok(self.collection(collection).count_documents(doc! {}).await?)
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        let stats = self
            .database
            .run_command(doc! { "collStats": collection })
            .await?;
        Ok(CollectionStats {
            count: number(&stats, "count").unwrap_or(0.0) as u64,
            avg_obj_size: number(&stats, "avgObjSize"),
            size: number(&stats, "size").map(|s| s as u64),
        })
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(to_filter(filter)?)
            .skip(skip)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(to_json).collect())
    }

    async fn sample(&self, collection: &str, size: u64) -> Result<Vec<Document>> {
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let cursor = self
            .collection(collection)
            .aggregate(vec![doc! { "$sample": { "size": size } }])
            .await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(to_json).collect())
    }

    async fn distinct(&self, collection: &str, field: &str, filter: &Filter) -> Result<Vec<Value>> {
        let values = self
            .collection(collection)
            .distinct(field, to_filter(filter)?)
            .await?;
        Ok(values.into_iter().map(Bson::into_relaxed_extjson).collect())
    }
}

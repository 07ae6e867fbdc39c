//! Hybrid payload prediction.
//!
//! Two independent sources are fetched together and merged into one ranked
//! field list:
//!
//! - the model, fed with the handler source from [`ControllerResolver`];
//! - the data store, via the inferred collection's sampled documents.
//!
//! Either source may come back empty. The merge rules live in [`merge`], the
//! request body assembly in [`payload`].

pub mod merge;
pub mod payload;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::PredictionConfig;
use crate::controller::ControllerResolver;
use crate::data::schema::describe_documents;
use crate::data::value::{object_id_hex, Document};
use crate::data::{
    Connection, DataSampler, DetailedSchemaField, ObjectIdResolver, SampleDocument,
};
use crate::error::{Result, RouteLensError};
use crate::inference::inflect::{pluralize, singularize};
use crate::inference::{CollectionInference, CollectionInferencer};
use crate::predict::{PayloadPredictor, PredictedField, PredictedHeader, PredictedPayload};
use crate::routes::DetectedRoute;

pub use payload::{generate_payload, PLACEHOLDER_OBJECT_ID};

/// Confidence kept when only an alternative collection name exists.
const ALTERNATIVE_MATCH_DISCOUNT: f64 = 0.8;
const MAX_SUGGESTED_IDS: usize = 5;
const MAX_SAMPLE_DOCUMENTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridOptions {
    pub prefer_real_data: Option<bool>,
    pub limit_fields: Option<usize>,
    pub exclude_fields: Vec<String>,
    /// Forced names; these beat every skip rule.
    pub include_fields: Vec<String>,
    /// Zero means the configured default.
    pub sample_size: usize,
}

impl From<&PredictionConfig> for HybridOptions {
    fn from(config: &PredictionConfig) -> Self {
        Self {
            prefer_real_data: config.prefer_real_data,
            limit_fields: config.limit_fields,
            exclude_fields: config.exclude_fields.clone(),
            include_fields: config.include_fields.clone(),
            sample_size: config.sample_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Ai,
    Mongodb,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendedApproach {
    Hybrid,
    AiOnly,
    MongoOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridFieldPrediction {
    #[serde(flatten)]
    pub base: PredictedField,
    pub real_values: Vec<Value>,
    pub has_real_data: bool,
    pub confidence: f64,
    pub source: FieldSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mongo_field_info: Option<DetailedSchemaField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridPayloadPrediction {
    pub route: DetectedRoute,
    pub fields: Vec<HybridFieldPrediction>,
    pub headers: Vec<PredictedHeader>,
    pub has_ai_data: bool,
    pub has_mongo_data: bool,
    pub recommended_approach: RecommendedApproach,
    pub collection: CollectionInference,
    /// Live collection the samples came from, if any matched.
    pub sampled_collection: Option<String>,
    pub sample_confidence: f64,
    pub sample_documents: Vec<SampleDocument>,
    pub payload: Map<String, Value>,
}

/// What the data-store path produced.
#[derive(Debug, Default)]
struct StoreData {
    collection: Option<String>,
    confidence: f64,
    documents: Vec<Document>,
    schema: Vec<DetailedSchemaField>,
}

pub struct HybridPayloadGenerator {
    resolver: ControllerResolver,
    inferencer: CollectionInferencer,
    predictor: Arc<dyn PayloadPredictor>,
    sampler: DataSampler,
    ids: ObjectIdResolver,
}

impl HybridPayloadGenerator {
    pub fn new(predictor: Arc<dyn PayloadPredictor>, connection: Arc<Connection>) -> Self {
        let sampler = DataSampler::new(connection);
        Self {
            resolver: ControllerResolver::new(),
            inferencer: CollectionInferencer::new(),
            predictor,
            ids: ObjectIdResolver::new(sampler.clone()),
            sampler,
        }
    }

    /// Merge the model's guess with sampled data for one route.
    ///
    /// Only a malformed route is an error; every environmental failure
    /// narrows the result instead.
    pub async fn generate_hybrid_prediction(
        &self,
        route: &DetectedRoute,
        options: &HybridOptions,
    ) -> Result<HybridPayloadPrediction> {
        if route.path.is_empty() || !route.path.starts_with('/') {
            return Err(RouteLensError::InvalidRoute(format!(
                "route path must start with '/': {:?}",
                route.path
            )));
        }

        let inference = self.inferencer.infer_collection_name(route);
        let (ai, store) = tokio::join!(
            self.predict_with_context(route),
            self.fetch_store_data(&inference, options)
        );

        let has_ai_data = ai.as_ref().is_some_and(|p| !p.fields.is_empty());
        let has_mongo_data = !store.documents.is_empty();

        let mut fields = self.merge(route, ai.as_ref(), &store, options).await;
        merge::sort_fields(&mut fields);
        if let Some(limit) = options.limit_fields {
            fields.truncate(limit);
        }

        let recommended_approach = merge::recommend(
            has_ai_data,
            has_mongo_data,
            options.prefer_real_data,
            store.confidence,
        );
        let payload = generate_payload(&fields, options.prefer_real_data.unwrap_or(true));

        info!(
            route = %route.display_short(),
            fields = fields.len(),
            ai = has_ai_data,
            mongo = has_mongo_data,
            approach = ?recommended_approach,
            "hybrid prediction ready"
        );

        Ok(HybridPayloadPrediction {
            route: route.clone(),
            fields,
            headers: ai.map(|p| p.headers).unwrap_or_default(),
            has_ai_data,
            has_mongo_data,
            recommended_approach,
            collection: inference,
            sampled_collection: store.collection,
            sample_confidence: store.confidence,
            sample_documents: store
                .documents
                .iter()
                .take(MAX_SAMPLE_DOCUMENTS)
                .map(SampleDocument::from_document)
                .collect(),
            payload,
        })
    }

    async fn predict_with_context(&self, route: &DetectedRoute) -> Option<PredictedPayload> {
        // File reads and parsing stay off the runtime so the store path keeps moving.
        let resolver = self.resolver.clone();
        let owned = route.clone();
        let context = tokio::task::spawn_blocking(move || resolver.extract_controller_context(&owned))
            .await
            .unwrap_or_else(|e| {
                warn!(route = %route.display_short(), error = %e, "controller extraction task failed");
                None
            });
        self.predictor.predict(route, context.as_ref()).await
    }

    async fn fetch_store_data(
        &self,
        inference: &CollectionInference,
        options: &HybridOptions,
    ) -> StoreData {
        if !self.sampler.is_available() {
            debug!("data store unavailable, skipping samples");
            return StoreData::default();
        }

        let existing = self.sampler.list_collections().await;
        let Some((collection, confidence)) = match_collection(inference, &existing) else {
            debug!(guess = %inference.collection_name, "no matching collection");
            return StoreData::default();
        };

        let size = if options.sample_size == 0 {
            PredictionConfig::default().sample_size
        } else {
            options.sample_size
        };
        let documents = self.sampler.sample_raw(&collection, size).await;
        let schema = describe_documents(&documents, &existing);
        debug!(collection = %collection, docs = documents.len(), fields = schema.len(), "sampled");

        StoreData {
            collection: Some(collection),
            confidence,
            documents,
            schema,
        }
    }

    async fn merge(
        &self,
        route: &DetectedRoute,
        ai: Option<&PredictedPayload>,
        store: &StoreData,
        options: &HybridOptions,
    ) -> Vec<HybridFieldPrediction> {
        let ai_fields: &[PredictedField] = ai.map(|p| p.fields.as_slice()).unwrap_or_default();
        let mut fields = Vec::new();

        // Step 1: schema fields.
        for schema in store.schema.iter().filter(|f| f.is_top_level() && f.frequency > 0.0) {
            if merge::should_skip(&schema.name, route.method, options) {
                continue;
            }
            let ai_field = ai_fields.iter().find(|f| f.name == schema.name);
            let field = merge::field_from_schema(schema, ai_field, &store.documents);
            if field.source == FieldSource::Mongodb && !field.has_real_data {
                debug!(field = %schema.name, "no observed values, skipping");
                continue;
            }
            fields.push(field);
        }

        // Step 2: model-only fields.
        for ai_field in ai_fields {
            if fields.iter().any(|f| f.base.name == ai_field.name)
                || merge::should_skip(&ai_field.name, route.method, options)
            {
                continue;
            }
            let mut real = merge::real_values_from(&store.documents, &ai_field.name);
            if real.is_empty() {
                if let Some(collection) = &store.collection {
                    real = self
                        .sampler
                        .get_field_samples(collection, &ai_field.name, merge::MAX_REAL_VALUES)
                        .await;
                }
            }
            fields.push(merge::field_from_ai(ai_field, real));
        }

        // Step 3: references.
        for field in fields.iter_mut().filter(|f| merge::looks_like_object_id_field(f)) {
            self.resolve_reference(field, store.collection.as_deref()).await;
        }
        fields
    }

    async fn resolve_reference(&self, field: &mut HybridFieldPrediction, source: Option<&str>) {
        let resolution = self
            .ids
            .resolve_object_id_field(&field.base.name, source, MAX_SUGGESTED_IDS)
            .await;
        let Some(best) = resolution.suggested_ids.first() else {
            return;
        };
        let has_ids = field
            .real_values
            .iter()
            .any(|v| object_id_hex(v).is_some());
        if has_ids && best.confidence < field.confidence {
            return;
        }

        if !field.has_real_data {
            field.confidence =
                (field.confidence + merge::REAL_VALUES_BONUS).clamp(merge::MIN_CONFIDENCE, merge::MAX_CONFIDENCE);
        }
        field.real_values = resolution
            .suggested_ids
            .iter()
            .map(|s| Value::String(s.id.clone()))
            .collect();
        field.has_real_data = true;
        if field.source == FieldSource::Ai {
            field.source = FieldSource::Hybrid;
        }
        debug!(
            field = %field.base.name,
            collections = ?resolution.collections,
            "reference resolved"
        );
    }
}

/// First candidate name that exists in `existing`, trying singular and
/// plural forms. Alternatives keep a discounted confidence.
fn match_collection(inference: &CollectionInference, existing: &[String]) -> Option<(String, f64)> {
    for (rank, candidate) in inference.candidate_names().enumerate() {
        let forms = [candidate.to_string(), singularize(candidate), pluralize(candidate)];
        let found = forms
            .iter()
            .find_map(|form| existing.iter().find(|e| e.eq_ignore_ascii_case(form)));
        if let Some(name) = found {
            let confidence = if rank == 0 {
                inference.confidence
            } else {
                inference.confidence * ALTERNATIVE_MATCH_DISCOUNT
            };
            return Some((name.clone(), confidence));
        }
    }
    None
}

//
//  object_id.rs
//  RouteLens
//
//  Suggest real ObjectIds for reference-looking fields.
//

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sampler::DataSampler;
use crate::inference::inflect::{pluralize, singularize};

/// Confidence of an id some document actually references.
pub const REFERENCED_CONFIDENCE: f64 = 0.9;
/// Confidence of an arbitrary id when the collection has real references.
pub const RANDOM_WITH_REFERENCES_CONFIDENCE: f64 = 0.8;
/// Confidence of an arbitrary id when nothing references the collection.
pub const RANDOM_CONFIDENCE: f64 = 0.5;

/// Well-known field names and the collections they usually point at.
const KNOWN_FIELDS: &[(&str, &[&str])] = &[
    ("userId", &["users", "user", "accounts", "profiles"]),
    ("user", &["users", "user", "accounts"]),
    ("authorId", &["users", "authors"]),
    ("author", &["users", "authors"]),
    ("ownerId", &["users", "owners"]),
    ("owner", &["users", "owners"]),
    ("createdBy", &["users"]),
    ("updatedBy", &["users"]),
    ("customerId", &["customers", "users"]),
    ("productId", &["products", "items"]),
    ("orderId", &["orders"]),
    ("categoryId", &["categories"]),
    ("postId", &["posts", "articles"]),
    ("commentId", &["comments"]),
    ("companyId", &["companies", "organizations"]),
    ("organizationId", &["organizations", "orgs"]),
    ("orgId", &["organizations", "orgs"]),
    ("teamId", &["teams"]),
    ("projectId", &["projects"]),
    ("parentId", &[]),
];

const REFERENCE_SUFFIXES: &[&str] = &["_id", "_ref", "Id", "ID", "Ref", "Ids", "IDs"];

/// One suggested id for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedId {
    pub id: String,
    pub source_collection: String,
    pub confidence: f64,
    /// Some document references this id through the same field.
    pub referenced: bool,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdResolution {
    pub field_name: String,
    pub success: bool,
    /// Candidate collections that exist in the store.
    pub collections: Vec<String>,
    /// Highest confidence first.
    pub suggested_ids: Vec<SuggestedId>,
}

/// Collections a reference field might point at, most likely first.
///
/// Known names come from a fixed table; anything else ending in
/// `Id`/`_id`/`Ref` yields the singular and plural of its stem.
pub fn candidate_collections(field: &str) -> Vec<String> {
    let name = field.rsplit('.').next().unwrap_or(field);
    if let Some((_, collections)) = KNOWN_FIELDS.iter().find(|(known, _)| *known == name) {
        if !collections.is_empty() {
            return collections.iter().map(|c| c.to_string()).collect();
        }
    }
    match reference_stem(name) {
        Some(stem) => {
            let singular = singularize(&stem);
            let mut out = vec![pluralize(&singular), singular];
            let lower = out[0].to_ascii_lowercase();
            if !out.contains(&lower) {
                out.push(lower);
            }
            out
        }
        None => Vec::new(),
    }
}

/// `shopId -> shop`, `order_ref -> order`.
pub fn reference_stem(field: &str) -> Option<String> {
    REFERENCE_SUFFIXES.iter().find_map(|suffix| {
        let stem = field.strip_suffix(suffix)?;
        let stem = stem.trim_end_matches(['_', '-']);
        (!stem.is_empty()).then(|| stem.to_string())
    })
}

/// Resolves reference fields against the live collection list.
#[derive(Debug, Clone)]
pub struct ObjectIdResolver {
    sampler: DataSampler,
}

impl ObjectIdResolver {
    pub fn new(sampler: DataSampler) -> Self {
        Self { sampler }
    }

    /// Suggest up to `limit` ids for `field`.
    ///
    /// With `source_collection`, ids that documents there actually reference
    /// come first; everything else is padding from the candidate collection.
    pub async fn resolve_object_id_field(
        &self,
        field: &str,
        source_collection: Option<&str>,
        limit: usize,
    ) -> ObjectIdResolution {
        let existing = self.sampler.list_collections().await;
        let collections: Vec<String> = candidate_collections(field)
            .iter()
            .filter_map(|candidate| {
                existing
                    .iter()
                    .find(|e| e.eq_ignore_ascii_case(candidate))
                    .cloned()
            })
            .fold(Vec::new(), |mut acc, c| {
                if !acc.contains(&c) {
                    acc.push(c);
                }
                acc
            });

        let mut suggested = Vec::new();
        for collection in &collections {
            suggested.extend(self.suggest_from(field, source_collection, collection, limit).await);
        }
        // Stable: equal confidence keeps candidate-collection order.
        suggested.sort_by(|a: &SuggestedId, b: &SuggestedId| b.confidence.total_cmp(&a.confidence));
        suggested.truncate(limit);

        debug!(field, collections = collections.len(), ids = suggested.len(), "resolved reference field");
        ObjectIdResolution {
            field_name: field.to_string(),
            success: !suggested.is_empty(),
            collections,
            suggested_ids: suggested,
        }
    }

    async fn suggest_from(
        &self,
        field: &str,
        source_collection: Option<&str>,
        collection: &str,
        limit: usize,
    ) -> Vec<SuggestedId> {
        let ids = match source_collection {
            Some(source) => {
                self.sampler
                    .find_valid_object_ids(source, field, collection, limit)
                    .await
            }
            None => self
                .sampler
                .get_sample_documents(collection, limit)
                .await
                .into_iter()
                .filter(|d| !d.id.is_empty())
                .map(|d| super::sampler::ReferencedId {
                    id: d.id,
                    referenced: false,
                    display_name: Some(d.display_name),
                })
                .collect(),
        };

        let any_referenced = ids.iter().any(|i| i.referenced);
        ids.into_iter()
            .map(|i| SuggestedId {
                confidence: if i.referenced {
                    REFERENCED_CONFIDENCE
                } else if any_referenced {
                    RANDOM_WITH_REFERENCES_CONFIDENCE
                } else {
                    RANDOM_CONFIDENCE
                },
                id: i.id,
                source_collection: collection.to_string(),
                referenced: i.referenced,
                display_name: i.display_name,
            })
            .collect()
    }
}

//
//  schema.rs
//  RouteLens
//
//  Per-field statistics and relation guesses on top of schema inference.
//

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::object_id::reference_stem;
use super::sampler::{schema_from_documents, DataSampler, SchemaField};
use super::value::{is_leaf, Document, ID_FIELD};
use crate::inference::inflect::{pluralize, singularize};

/// Fields present in more than this share of samples count as required.
pub const REQUIRED_FREQUENCY: f64 = 90.0;
/// Fields with at most this many distinct values get an enumeration.
pub const MAX_ENUM_VALUES: usize = 10;

pub const RELATION_NAME_ONLY: f64 = 0.3;
pub const RELATION_TARGET_MISSING: f64 = 0.4;
pub const RELATION_TARGET_EXISTS: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationInfo {
    pub is_relation: bool,
    pub target_collection: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedSchemaField {
    pub name: String,
    /// Observed types joined with `|`, nulls left out unless nothing else
    /// was seen.
    #[serde(rename = "type")]
    pub field_type: String,
    pub frequency: f64,
    pub is_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_values: Option<Vec<Value>>,
    pub examples: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_info: Option<RelationInfo>,
}

impl DetailedSchemaField {
    pub fn is_top_level(&self) -> bool {
        !self.name.contains('.') && !self.name.contains("[]")
    }
}

/// Statistics over a sample of documents.
#[derive(Debug, Clone)]
pub struct SchemaViewer {
    sampler: DataSampler,
}

impl SchemaViewer {
    pub fn new(sampler: DataSampler) -> Self {
        Self { sampler }
    }

    /// Sample `collection` and describe every field path.
    pub async fn get_detailed_schema(
        &self,
        collection: &str,
        sample_size: usize,
    ) -> Vec<DetailedSchemaField> {
        let docs = self.sampler.sample_raw(collection, sample_size).await;
        if docs.is_empty() {
            return Vec::new();
        }
        let existing = self.sampler.list_collections().await;
        describe_documents(&docs, &existing)
    }
}

/// Detailed schema for documents already in hand. `existing_collections`
/// feeds the relation guesses.
pub fn describe_documents(docs: &[Document], existing_collections: &[String]) -> Vec<DetailedSchemaField> {
    let values = collect_values(docs);
    schema_from_documents(docs)
        .into_iter()
        .map(|field| {
            let observed = values.get(&field.name).map(Vec::as_slice).unwrap_or(&[]);
            detail(field, observed, existing_collections)
        })
        .collect()
}

fn detail(field: SchemaField, values: &[&Value], existing: &[String]) -> DetailedSchemaField {
    let non_null: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();

    let lengths: Vec<usize> = non_null
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.chars().count()))
        .collect();
    let numbers: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();

    let scalars: Vec<&Value> = non_null.iter().copied().filter(|v| is_leaf(v)).collect();
    let distinct: BTreeSet<String> = scalars.iter().map(|v| v.to_string()).collect();

    let is_unique = (!scalars.is_empty()).then(|| distinct.len() == scalars.len());
    let possible_values = (!scalars.is_empty() && distinct.len() <= MAX_ENUM_VALUES).then(|| {
        let mut seen = BTreeSet::new();
        scalars
            .iter()
            .filter(|v| seen.insert(v.to_string()))
            .map(|v| (*v).clone())
            .collect()
    });

    let non_null_types: Vec<&str> = field
        .types
        .iter()
        .map(String::as_str)
        .filter(|t| *t != "null")
        .collect();
    let field_type = if non_null_types.is_empty() {
        "null".to_string()
    } else {
        non_null_types.join("|")
    };

    DetailedSchemaField {
        relation_info: relation_info(&field.name, existing),
        is_required: field.frequency > REQUIRED_FREQUENCY,
        min_length: lengths.iter().min().copied(),
        max_length: lengths.iter().max().copied(),
        min_value: numbers.iter().copied().reduce(f64::min),
        max_value: numbers.iter().copied().reduce(f64::max),
        is_unique,
        possible_values,
        field_type,
        frequency: field.frequency,
        examples: field.examples,
        name: field.name,
    }
}

/// Every value seen at each field path, nulls included.
fn collect_values(docs: &[Document]) -> BTreeMap<String, Vec<&Value>> {
    fn visit<'a>(path: String, value: &'a Value, depth: usize, out: &mut BTreeMap<String, Vec<&'a Value>>) {
        out.entry(path.clone()).or_default().push(value);
        if depth >= super::sampler::MAX_SCHEMA_DEPTH {
            return;
        }
        match value {
            Value::Object(map) if !is_leaf(value) => {
                for (key, child) in map {
                    visit(format!("{path}.{key}"), child, depth + 1, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    visit(format!("{path}[]"), item, depth + 1, out);
                }
            }
            _ => {}
        }
    }

    let mut out = BTreeMap::new();
    for doc in docs {
        for (key, value) in doc {
            visit(key.clone(), value, 0, &mut out);
        }
    }
    out
}

/// Coarse relation guess for any id-looking field other than the primary
/// key.
pub fn relation_info(field: &str, existing: &[String]) -> Option<RelationInfo> {
    let name = field.rsplit('.').next().unwrap_or(field).trim_end_matches("[]");
    if name == ID_FIELD || !name.to_ascii_lowercase().contains("id") {
        return None;
    }

    let Some(stem) = reference_stem(name) else {
        return Some(RelationInfo {
            is_relation: true,
            target_collection: None,
            confidence: RELATION_NAME_ONLY,
        });
    };

    let singular = singularize(&stem);
    let plural = pluralize(&singular);
    let found = existing
        .iter()
        .find(|c| c.eq_ignore_ascii_case(&plural) || c.eq_ignore_ascii_case(&singular));

    Some(match found {
        Some(target) => RelationInfo {
            is_relation: true,
            target_collection: Some(target.clone()),
            confidence: RELATION_TARGET_EXISTS,
        },
        None => RelationInfo {
            is_relation: true,
            target_collection: Some(plural),
            confidence: RELATION_TARGET_MISSING,
        },
    })
}

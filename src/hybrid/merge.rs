//
//  merge.rs
//  RouteLens
//
//  Field merge rules: skip policy, confidence scoring, ordering and the
//  approach recommendation.
//

use serde_json::Value;

use super::{FieldSource, HybridFieldPrediction, HybridOptions, RecommendedApproach};
use crate::data::value::{get_path, object_id_hex, Document, ID_FIELD};
use crate::data::DetailedSchemaField;
use crate::predict::PredictedField;
use crate::routes::HttpMethod;

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 1.0;
pub const REAL_VALUES_BONUS: f64 = 0.2;
/// Sample confidence above which real data is worth recommending.
pub const SAMPLE_CONFIDENCE_THRESHOLD: f64 = 0.6;
pub const MAX_REAL_VALUES: usize = 5;

const VERSION_FIELD: &str = "__v";
const AUDIT_FIELDS: &[&str] = &["createdAt", "updatedAt", "created_at", "updated_at"];

/// Which sources know about a field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceInputs {
    /// `(frequency %, required)` from the schema.
    pub schema: Option<(f64, bool)>,
    /// `required` as the model predicted it.
    pub ai: Option<bool>,
    pub has_real_values: bool,
    pub type_mismatch: bool,
}

/// Additive score clamped to `[0.1, 1.0]`.
pub fn compute_confidence(inputs: ConfidenceInputs) -> f64 {
    let mut score = 0.5;
    if let Some((frequency, required)) = inputs.schema {
        score += 0.3;
        if frequency > 80.0 {
            score += 0.1;
        }
        if required {
            score += 0.1;
        }
    }
    if let Some(required) = inputs.ai {
        score += 0.2;
        if required {
            score += 0.1;
        }
    }
    if inputs.has_real_values {
        score += REAL_VALUES_BONUS;
    }
    if inputs.type_mismatch && inputs.schema.is_some() && inputs.ai.is_some() {
        score -= 0.1;
    }
    score.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Skip policy for both merge steps. Forced names always survive.
pub fn should_skip(name: &str, method: HttpMethod, options: &HybridOptions) -> bool {
    if options.include_fields.iter().any(|f| f == name) {
        return false;
    }
    if options.exclude_fields.iter().any(|f| f == name) {
        return true;
    }
    if name.starts_with("__") || name == VERSION_FIELD {
        return true;
    }
    if method.is_create() && (name == ID_FIELD || AUDIT_FIELDS.contains(&name)) {
        return true;
    }
    false
}

/// Up to five distinct non-null values of `name` across the sampled documents.
pub fn real_values_from(docs: &[Document], name: &str) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for doc in docs {
        let values = match get_path(doc, name) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => continue,
            Some(value) => vec![value.clone()],
        };
        for value in values {
            if out.len() >= MAX_REAL_VALUES {
                return out;
            }
            if !value.is_null() && !out.contains(&value) {
                out.push(value);
            }
        }
    }
    out
}

/// Up to five distinct raw non-null values of `name`, arrays kept whole.
pub fn observed_values(docs: &[Document], name: &str) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for value in docs.iter().filter_map(|doc| get_path(doc, name)) {
        if out.len() >= MAX_REAL_VALUES {
            break;
        }
        if !value.is_null() && !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

/// Canonical lowercase type family, so `integer` matches `number`.
fn type_family(t: &str) -> String {
    let t = t.trim().to_ascii_lowercase();
    match t.as_str() {
        "int" | "integer" | "float" | "double" | "decimal" | "long" => "number".to_string(),
        "bool" => "boolean".to_string(),
        "datetime" | "timestamp" => "date".to_string(),
        "id" | "objectid" | "object_id" | "reference" => "objectid".to_string(),
        "list" => "array".to_string(),
        _ => t,
    }
}

/// Whether the model's declared type matches anything the schema observed.
pub fn types_agree(ai_type: &str, schema_type: &str) -> bool {
    let ai = type_family(ai_type);
    schema_type.split('|').map(type_family).any(|s| {
        s == ai
            // ObjectIds are sent as hex strings.
            || (s == "objectid" && ai == "string")
            || (s == "date" && ai == "string")
    })
}

/// Step 1: a schema field, enriched by the model's field of the same name.
pub fn field_from_schema(
    schema: &DetailedSchemaField,
    ai: Option<&PredictedField>,
    docs: &[Document],
) -> HybridFieldPrediction {
    let mut real_values = real_values_from(docs, &schema.name);
    if real_values.is_empty() {
        real_values = schema.examples.iter().filter(|v| !v.is_null()).cloned().collect();
    }
    if real_values.is_empty() {
        // Empty arrays and leafless objects still count as observed data.
        real_values = observed_values(docs, &schema.name);
    }

    let type_mismatch = ai.is_some_and(|a| !types_agree(&a.field_type, &schema.field_type));
    let confidence = compute_confidence(ConfidenceInputs {
        schema: Some((schema.frequency, schema.is_required)),
        ai: ai.map(|a| a.required),
        has_real_values: !real_values.is_empty(),
        type_mismatch,
    });

    let example = real_values
        .first()
        .or_else(|| schema.examples.first())
        .cloned()
        .or_else(|| ai.map(|a| a.example.clone()))
        .unwrap_or(Value::Null);

    let description = ai
        .map(|a| a.description.clone())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| {
            format!(
                "Present in {:.0}% of sampled documents",
                schema.frequency
            )
        });

    HybridFieldPrediction {
        base: PredictedField {
            name: schema.name.clone(),
            field_type: schema.field_type.split('|').next().unwrap_or("string").to_string(),
            required: schema.is_required || ai.is_some_and(|a| a.required),
            example,
            description,
        },
        has_real_data: !real_values.is_empty(),
        real_values,
        confidence,
        source: if ai.is_some() {
            FieldSource::Hybrid
        } else {
            FieldSource::Mongodb
        },
        mongo_field_info: Some(schema.clone()),
    }
}

/// Step 2: a field only the model knows about.
pub fn field_from_ai(ai: &PredictedField, real_values: Vec<Value>) -> HybridFieldPrediction {
    let has_real = !real_values.is_empty();
    HybridFieldPrediction {
        base: ai.clone(),
        confidence: compute_confidence(ConfidenceInputs {
            schema: None,
            ai: Some(ai.required),
            has_real_values: has_real,
            type_mismatch: false,
        }),
        has_real_data: has_real,
        real_values,
        source: if has_real {
            FieldSource::Hybrid
        } else {
            FieldSource::Ai
        },
        mongo_field_info: None,
    }
}

/// Name, declared type or current values suggest an ObjectId reference.
pub fn looks_like_object_id_field(field: &HybridFieldPrediction) -> bool {
    field.base.name.to_ascii_lowercase().contains("id")
        || field.base.field_type.to_ascii_lowercase().contains("objectid")
        || field.real_values.iter().any(|v| object_id_hex(v).is_some())
}

/// Required first, then descending confidence. Stable.
pub fn sort_fields(fields: &mut [HybridFieldPrediction]) {
    fields.sort_by(|a, b| {
        b.base
            .required
            .cmp(&a.base.required)
            .then(b.confidence.total_cmp(&a.confidence))
    });
}

pub fn recommend(
    has_ai_data: bool,
    has_mongo_data: bool,
    prefer_real_data: Option<bool>,
    sample_confidence: f64,
) -> RecommendedApproach {
    match (has_ai_data, has_mongo_data) {
        (_, false) => RecommendedApproach::AiOnly,
        (false, true) => RecommendedApproach::MongoOnly,
        (true, true) => match prefer_real_data {
            None => RecommendedApproach::Hybrid,
            Some(true) if sample_confidence > SAMPLE_CONFIDENCE_THRESHOLD => {
                RecommendedApproach::Hybrid
            }
            Some(_) => RecommendedApproach::AiOnly,
        },
    }
}

//
//  value.rs
//  RouteLens
//
//  Helpers over documents in relaxed extended JSON: ObjectIds appear as
//  `{"$oid": "..."}` and dates as `{"$date": ...}`.
//

use serde_json::{Map, Value};

/// A stored document.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

const NAME_FIELDS: &[&str] = &[
    "name",
    "title",
    "displayName",
    "fullName",
    "username",
    "email",
    "label",
    "slug",
    "code",
];

const SUMMARY_FIELDS: usize = 3;
const SUMMARY_VALUE_CHARS: usize = 30;

/// Type label used in schemas: `string`, `number`, `boolean`, `null`,
/// `array`, `object`, `ObjectId` or `Date`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(map) => match extended_json_tag(map) {
            Some("$oid") => "ObjectId",
            Some("$date") => "Date",
            Some("$numberDecimal") | Some("$numberLong") => "number",
            Some(_) | None => "object",
        },
    }
}

/// `$oid`, `$date`, ... when `map` is a single-key extended JSON wrapper.
pub fn extended_json_tag(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.keys().next().map(String::as_str).filter(|k| k.starts_with('$'))
}

/// Scalars and extended JSON wrappers; the schema walk stops here.
pub fn is_leaf(value: &Value) -> bool {
    match value {
        Value::Object(map) => extended_json_tag(map).is_some(),
        Value::Array(_) => false,
        _ => true,
    }
}

/// 24 hex digits.
pub fn is_object_id_hex(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Hex form of an ObjectId value, whether wrapped or stored as a string.
pub fn object_id_hex(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if is_object_id_hex(s) => Some(s.clone()),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(s)) if is_object_id_hex(s) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

pub fn object_id_value(hex: &str) -> Value {
    serde_json::json!({ "$oid": hex })
}

/// Value at a dotted path.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// `_id` of a document as display text.
pub fn document_id(doc: &Document) -> String {
    match doc.get(ID_FIELD) {
        Some(value) => object_id_hex(value).unwrap_or_else(|| display_value(value)),
        None => String::new(),
    }
}

/// Best-effort human label from the usual name-like fields.
pub fn display_name(doc: &Document) -> String {
    if let Some(label) = NAME_FIELDS.iter().find_map(|f| match doc.get(*f) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }) {
        return label;
    }
    match (doc.get("firstName"), doc.get("lastName")) {
        (Some(Value::String(first)), Some(Value::String(last))) => format!("{first} {last}"),
        _ => document_id(doc),
    }
}

/// `key: value, ...` preview of the first few non-id fields.
pub fn summary(doc: &Document) -> String {
    doc.iter()
        .filter(|(k, _)| k.as_str() != ID_FIELD && !k.starts_with("__"))
        .take(SUMMARY_FIELDS)
        .map(|(k, v)| format!("{k}: {}", truncate(&display_value(v), SUMMARY_VALUE_CHARS)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unquoted text for strings and wrapped scalars, JSON otherwise.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match extended_json_tag(map).and_then(|tag| map.get(tag)) {
            Some(Value::String(s)) => s.clone(),
            Some(inner) => inner.to_string(),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(&json!({"$oid": "507f1f77bcf86cd799439011"})), "ObjectId");
        assert_eq!(type_name(&json!({"$date": "2024-01-01T00:00:00Z"})), "Date");
        assert_eq!(type_name(&json!({"a": 1})), "object");
        assert_eq!(type_name(&json!([1])), "array");
        assert_eq!(type_name(&json!(1.5)), "number");
        assert_eq!(type_name(&json!(null)), "null");
    }

    #[test]
    fn test_object_ids() {
        assert!(is_object_id_hex("507f1f77bcf86cd799439011"));
        assert!(!is_object_id_hex("507f1f77bcf86cd79943901"));
        assert!(!is_object_id_hex("507f1f77bcf86cd79943901z"));
        assert_eq!(
            object_id_hex(&json!({"$oid": "507f1f77bcf86cd799439011"})).as_deref(),
            Some("507f1f77bcf86cd799439011")
        );
        assert_eq!(object_id_hex(&json!("nope")), None);
    }

    #[test]
    fn test_paths_and_labels() {
        let d = doc(json!({
            "_id": {"$oid": "507f1f77bcf86cd799439011"},
            "profile": {"city": "Oslo"},
            "firstName": "Ada",
            "lastName": "Lovelace",
            "bio": "Wrote the first published algorithm intended for a machine"
        }));
        assert_eq!(get_path(&d, "profile.city"), Some(&json!("Oslo")));
        assert_eq!(get_path(&d, "profile.zip"), None);
        assert_eq!(display_name(&d), "Ada Lovelace");
        assert_eq!(document_id(&d), "507f1f77bcf86cd799439011");

        let s = summary(&d);
        assert!(!s.contains("_id"));
        assert!(s.contains("firstName: Ada"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}

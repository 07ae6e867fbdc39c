//
//  payload.rs
//  RouteLens
//
//  Final request body assembly from a merged field list.
//

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use super::HybridFieldPrediction;
use crate::data::value::{extended_json_tag, object_id_hex};

/// Well-known valid ObjectId used when nothing better is available.
pub const PLACEHOLDER_OBJECT_ID: &str = "507f1f77bcf86cd799439011";

/// Build the request body: one key per field, in field order.
pub fn generate_payload(fields: &[HybridFieldPrediction], prefer_real_data: bool) -> Map<String, Value> {
    let mut payload = Map::new();
    for field in fields {
        let chosen = match field.real_values.first() {
            Some(real) if prefer_real_data => real,
            _ => &field.base.example,
        };
        let kind = field.base.field_type.to_ascii_lowercase();
        let value = if kind.contains("date") {
            Value::String(timestamp(chosen))
        } else if kind.contains("objectid") {
            Value::String(object_id_hex(chosen).unwrap_or_else(|| PLACEHOLDER_OBJECT_ID.to_string()))
        } else {
            plain(chosen)
        };
        payload.insert(field.base.name.clone(), value);
    }
    payload
}

/// Normalised RFC 3339 timestamp; unparseable input becomes "now".
fn timestamp(value: &Value) -> String {
    parse_date(value)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => match map.get("$date")? {
            Value::Object(inner) => inner
                .get("$numberLong")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            other => parse_date(other),
        },
        _ => None,
    }
}

/// Strip extended JSON wrappers so the body reads like client input.
fn plain(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(plain).collect()),
        Value::Object(map) => match extended_json_tag(map) {
            Some("$oid") => object_id_hex(value).map(Value::String).unwrap_or(Value::Null),
            Some("$date") => Value::String(timestamp(value)),
            Some("$numberLong" | "$numberInt") => map
                .values()
                .next()
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<i64>().ok())
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|| value.clone()),
            Some("$numberDecimal" | "$numberDouble") => map
                .values()
                .next()
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<f64>().ok())
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| value.clone()),
            _ => Value::Object(map.iter().map(|(k, v)| (k.clone(), plain(v))).collect()),
        },
        other => other.clone(),
    }
}

//! BSON to JSON conversion at the HTTP boundary.
//!
//! Documents leave the gateway the way a Node driver would print them:
//! object ids become hex strings and dates become RFC 3339 strings with
//! millisecond precision. Request bodies are stored field by field, so
//! extended-JSON wrappers such as `{"$date": ...}` stay plain objects.

use chrono::{DateTime as ChronoDateTime, SecondsFormat};
use mongodb::bson::{Bson, DateTime, Document};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::AppError;

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => iso_string(dt)
            .map(Value::String)
            .unwrap_or_else(|| Value::from(dt.timestamp_millis())),
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}

/// Same shape as JavaScript's `Date.prototype.toISOString`.
fn iso_string(dt: DateTime) -> Option<String> {
    ChronoDateTime::from_timestamp_millis(dt.timestamp_millis())
        .map(|utc| utc.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn document_to_json(doc: Document) -> Value {
    Value::Object(
        doc.into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect::<Map<String, Value>>(),
    )
}

pub fn documents_to_json(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(document_to_json).collect())
}

/// Integers that fit 32 bits are stored as `Int32`, like the Node driver does.
fn number_to_bson(n: &Number) -> Bson {
    if let Some(i) = n.as_i64() {
        return i32::try_from(i).map_or(Bson::Int64(i), Bson::Int32);
    }
    n.as_f64().map_or(Bson::Null, Bson::Double)
}

pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => number_to_bson(&n),
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(map_to_document(map)),
    }
}

fn map_to_document(map: Map<String, Value>) -> Document {
    let mut doc = Document::new();
    for (key, value) in map {
        doc.insert(key, json_to_bson(value));
    }
    doc
}

/// Request bodies must be JSON objects.
pub fn json_to_document(value: Value) -> Result<Document, AppError> {
    match value {
        Value::Object(map) => Ok(map_to_document(map)),
        _ => Err(AppError::MalformedPayload),
    }
}

pub fn serialize_bson<S>(value: &Bson, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    bson_to_json(value.clone()).serialize(serializer)
}

pub fn serialize_optional_bson<S>(value: &Option<Bson>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.clone().map(bson_to_json).serialize(serializer)
}

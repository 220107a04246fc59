//! Firestore REST API types and JSON conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Firestore document value types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    pub create_time: Option<String>,
    /// Update time
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }
}

/// List documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Option<Vec<Document>>,
    pub next_page_token: Option<String>,
}

/// A single write operation in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    /// Update or insert a document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,

    /// Delete a document by full resource name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

impl Write {
    pub fn delete(full_document_name: impl Into<String>) -> Self {
        Self {
            update: None,
            delete: Some(full_document_name.into()),
        }
    }
}

/// Batch write request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWriteRequest {
    pub writes: Vec<Write>,
}

/// Status of a single write in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// gRPC status code (0 = OK).
    pub code: Option<i32>,
    /// Error message if failed.
    pub message: Option<String>,
}

/// Batch write response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWriteResponse {
    /// Status for each write, in order.
    pub status: Option<Vec<Status>>,
}

impl BatchWriteResponse {
    /// Create an empty response for empty batch writes.
    pub fn empty() -> Self {
        Self { status: Some(vec![]) }
    }

    /// Check for partial failures in the batch response.
    pub fn check_for_errors(&self) -> crate::error::FirestoreResult<()> {
        if let Some(statuses) = &self.status {
            for (i, status) in statuses.iter().enumerate() {
                if let Some(code) = status.code {
                    if code != 0 {
                        let msg = status.message.as_deref().unwrap_or("Unknown error");
                        return Err(crate::error::FirestoreError::request_failed(format!(
                            "Batch write failed at index {}: {} (code {})",
                            i, msg, code
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// serde_json <-> Firestore Value conversion
//
// Script documents are serialized through serde_json and mapped structurally,
// so nested scenes/keyframes round-trip without per-field mapping code.
// ============================================================================

/// Convert a serde_json value into a Firestore value.
pub fn to_firestore_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::NullValue(()),
        serde_json::Value::Bool(b) => Value::BooleanValue(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::IntegerValue(i.to_string())
            } else {
                Value::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::StringValue(s.clone()),
        serde_json::Value::Array(items) => Value::ArrayValue(ArrayValue {
            values: Some(items.iter().map(to_firestore_value).collect()),
        }),
        serde_json::Value::Object(map) => Value::MapValue(MapValue {
            fields: Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                    .collect(),
            ),
        }),
    }
}

/// Convert a Firestore value back into a serde_json value.
pub fn from_firestore_value(value: &Value) -> serde_json::Value {
    match value {
        Value::NullValue(()) => serde_json::Value::Null,
        Value::BooleanValue(b) => serde_json::Value::Bool(*b),
        Value::IntegerValue(s) => s
            .parse::<i64>()
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null),
        Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::TimestampValue(s) | Value::StringValue(s) => serde_json::Value::String(s.clone()),
        Value::ArrayValue(arr) => serde_json::Value::Array(
            arr.values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(from_firestore_value)
                .collect(),
        ),
        Value::MapValue(map) => serde_json::Value::Object(
            map.fields
                .as_ref()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), from_firestore_value(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
    }
}

/// Map a JSON object to Firestore document fields.
pub fn object_to_fields(json: &serde_json::Value) -> HashMap<String, Value> {
    match json {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), to_firestore_value(v)))
            .collect(),
        _ => HashMap::new(),
    }
}

/// Map Firestore document fields back to a JSON object.
pub fn fields_to_object(fields: &HashMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), from_firestore_value(v)))
            .collect(),
    )
}

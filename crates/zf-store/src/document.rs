//! # Documents and Field Values
//!
//! A document is a JSON object stored at a [`DocPath`]. Its id is the last
//! path segment and is never stored in the fields; [`Document::decode`]
//! injects it and [`to_fields`] strips it.
//!
//! ## Write Sentinels
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sentinel                         Resolved at commit to                 │
//! │  ───────────────────────────────  ───────────────────────────────────── │
//! │  FieldValue::server_timestamp()   commit time, RFC 3339                 │
//! │  FieldValue::array_union([..])    existing array + missing items        │
//! │  FieldValue::array_remove([..])   existing array minus the items        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Sentinels are recognised in top-level fields only.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::path::DocPath;

/// Document fields.
pub type Fields = Map<String, Value>;

const SERVER_TIMESTAMP: &str = "$serverTimestamp";
const ARRAY_UNION: &str = "$arrayUnion";
const ARRAY_REMOVE: &str = "$arrayRemove";

// =============================================================================
// Document
// =============================================================================

/// A document as last read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub fields: Fields,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Top-level field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decodes `{id, ...fields}` into `T`.
    ///
    /// A stored `id` field, if one slipped in, is overridden by the path id.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id().to_string()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            StoreError::Serialization(format!("{}: {}", self.path, e))
        })
    }
}

/// Serializes a value into document fields, dropping its `id`.
///
/// ## Errors
/// `Serialization` if the value is not a JSON object.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Serialization(format!(
            "documents must be objects, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Field Value Sentinels
// =============================================================================

/// Constructors for write sentinels.
pub struct FieldValue;

impl FieldValue {
    /// Replaced with the commit time.
    pub fn server_timestamp() -> Value {
        json!({ SERVER_TIMESTAMP: true })
    }

    /// Appends each item not already present in the stored array.
    pub fn array_union<I>(items: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        json!({ ARRAY_UNION: items.into_iter().map(Into::into).collect::<Vec<Value>>() })
    }

    /// Removes every occurrence of each item from the stored array.
    pub fn array_remove<I>(items: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        json!({ ARRAY_REMOVE: items.into_iter().map(Into::into).collect::<Vec<Value>>() })
    }
}

/// Formats a commit time the way it is stored in documents.
pub(crate) fn timestamp_value(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn sentinel(value: &Value) -> Option<(&str, &Value)> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    let (key, inner) = obj.iter().next()?;
    match key.as_str() {
        SERVER_TIMESTAMP | ARRAY_UNION | ARRAY_REMOVE => Some((key.as_str(), inner)),
        _ => None,
    }
}

/// Resolves one incoming field against the stored value.
fn resolve(current: Option<&Value>, incoming: Value, now: DateTime<Utc>) -> Value {
    let Some((kind, operand)) = sentinel(&incoming) else {
        return incoming;
    };
    let items = operand.as_array().cloned().unwrap_or_default();
    let existing = current
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    match kind {
        SERVER_TIMESTAMP => timestamp_value(now),
        ARRAY_UNION => {
            let mut merged = existing;
            for item in items {
                if !merged.contains(&item) {
                    merged.push(item);
                }
            }
            Value::Array(merged)
        }
        _ => Value::Array(
            existing
                .into_iter()
                .filter(|value| !items.contains(value))
                .collect(),
        ),
    }
}

/// Writes `incoming` over `base` field by field, resolving sentinels.
pub(crate) fn apply_fields(mut base: Fields, incoming: Fields, now: DateTime<Utc>) -> Fields {
    for (key, value) in incoming {
        let resolved = resolve(base.get(&key), value, now);
        base.insert(key, resolved);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Item {
        #[serde(default)]
        id: String,
        display_name: String,
    }

    fn doc(path: &str, fields: Value) -> Document {
        Document {
            path: DocPath::new(path).unwrap(),
            fields: fields.as_object().cloned().unwrap(),
            create_time: Utc::now(),
            update_time: Utc::now(),
        }
    }

    #[test]
    fn test_decode_injects_id() {
        let item: Item = doc("items/abc", json!({ "displayName": "Oak" })).decode().unwrap();
        assert_eq!(
            item,
            Item {
                id: "abc".to_string(),
                display_name: "Oak".to_string()
            }
        );
    }

    #[test]
    fn test_decode_path_id_wins() {
        let item: Item = doc("items/abc", json!({ "id": "stale", "displayName": "Oak" }))
            .decode()
            .unwrap();
        assert_eq!(item.id, "abc");
    }

    #[test]
    fn test_decode_error_names_path() {
        let err = doc("items/abc", json!({})).decode::<Item>().unwrap_err();
        assert!(err.to_string().contains("items/abc"));
    }

    #[test]
    fn test_to_fields_strips_id() {
        let fields = to_fields(&Item {
            id: "abc".to_string(),
            display_name: "Oak".to_string(),
        })
        .unwrap();
        assert_eq!(Value::Object(fields), json!({ "displayName": "Oak" }));
        assert!(to_fields(&42).is_err());
    }

    #[test]
    fn test_server_timestamp_resolves() {
        let now = Utc::now();
        let incoming = json!({ "createdAt": FieldValue::server_timestamp() });
        let fields = apply_fields(Fields::new(), incoming.as_object().cloned().unwrap(), now);

        let stored = fields["createdAt"].as_str().unwrap();
        let parsed: DateTime<Utc> = stored.parse().unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_array_union_and_remove() {
        let now = Utc::now();
        let base = json!({ "orderIds": ["a", "b"] }).as_object().cloned().unwrap();

        let union = json!({ "orderIds": FieldValue::array_union(["b", "c"]) });
        let merged = apply_fields(base, union.as_object().cloned().unwrap(), now);
        assert_eq!(merged["orderIds"], json!(["a", "b", "c"]));

        let remove = json!({ "orderIds": FieldValue::array_remove(["a"]) });
        let trimmed = apply_fields(merged, remove.as_object().cloned().unwrap(), now);
        assert_eq!(trimmed["orderIds"], json!(["b", "c"]));
    }

    #[test]
    fn test_array_union_on_missing_field() {
        let incoming = json!({ "tags": FieldValue::array_union(["x", "x"]) });
        let fields = apply_fields(Fields::new(), incoming.as_object().cloned().unwrap(), Utc::now());
        assert_eq!(fields["tags"], json!(["x"]));
    }

    #[test]
    fn test_plain_objects_are_not_sentinels() {
        let incoming = json!({ "dimensions": { "width": 1, "height": 2 } });
        let fields = apply_fields(
            Fields::new(),
            incoming.as_object().cloned().unwrap(),
            Utc::now(),
        );
        assert_eq!(fields["dimensions"], json!({ "width": 1, "height": 2 }));
    }
}

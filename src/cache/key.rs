//! Sub-key derivation and the cached payload codec.
//!
//! A sub-key is canonical JSON over the whole query shape. Filters and
//! projections are rendered as canonical extended JSON with object keys
//! sorted, so an ObjectId never collides with a string holding the same hex
//! and `{a, b}` equals `{b, a}`. Sort stays an ordered list because
//! direction order changes results.

use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value, json};

use super::CacheError;
use crate::database::{FindOptions, Query, QueryOutput};

/// Canonical cache sub-key for a query.
pub fn sub_key(query: &Query) -> String {
    let (op, query_doc, options, fields) = match query {
        Query::Find {
            filter, options, ..
        } => (
            "find",
            canonical(filter),
            options_json(options),
            options.projection.as_ref().map_or(Value::Null, canonical),
        ),
        Query::FindOne {
            filter, projection, ..
        } => (
            "findOne",
            canonical(filter),
            Value::Null,
            projection.as_ref().map_or(Value::Null, canonical),
        ),
        Query::Count { filter, .. } => ("count", canonical(filter), Value::Null, Value::Null),
    };

    // serde_json may preserve insertion order, so build the outer object in key order too
    let mut key = Map::new();
    key.insert("collection".into(), Value::from(query.collection()));
    key.insert("fields".into(), fields);
    key.insert("op".into(), Value::from(op));
    key.insert("options".into(), options);
    key.insert("query".into(), query_doc);
    Value::Object(key).to_string()
}

fn options_json(options: &FindOptions) -> Value {
    let sort: Vec<Value> = options
        .sort
        .iter()
        .map(|(field, direction)| json!([field, direction]))
        .collect();
    let mut out = Map::new();
    out.insert("limit".into(), json!(options.limit));
    out.insert("skip".into(), json!(options.skip));
    out.insert("sort".into(), Value::Array(sort));
    Value::Object(out)
}

fn canonical(doc: &Document) -> Value {
    sort_keys(Bson::Document(doc.clone()).into_canonical_extjson())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Serialize a query result for storage.
pub fn encode(output: &QueryOutput) -> Result<String, CacheError> {
    let value = match output {
        QueryOutput::Many(docs) => Value::Array(
            docs.iter()
                .map(|d| Bson::Document(d.clone()).into_canonical_extjson())
                .collect(),
        ),
        QueryOutput::One(Some(doc)) => Bson::Document(doc.clone()).into_canonical_extjson(),
        QueryOutput::One(None) => Value::Null,
        QueryOutput::Count(n) => Value::from(*n),
    };
    serde_json::to_string(&value).map_err(|e| CacheError::Encode(e.to_string()))
}

/// Rebuild a query result from a stored payload.
///
/// The payload shape must agree with the query: an array for `find`, an
/// object or `null` for `findOne`, a number for `count`.
pub fn decode(query: &Query, payload: &str) -> Result<QueryOutput, CacheError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| CacheError::Decode(e.to_string()))?;

    match (query, value) {
        (Query::Find { .. }, Value::Array(items)) => items
            .into_iter()
            .map(to_document)
            .collect::<Result<Vec<_>, _>>()
            .map(QueryOutput::Many),
        (Query::FindOne { .. }, Value::Null) => Ok(QueryOutput::One(None)),
        (Query::FindOne { .. }, value @ Value::Object(_)) => {
            Ok(QueryOutput::One(Some(to_document(value)?)))
        }
        (Query::Count { .. }, Value::Number(n)) => n
            .as_u64()
            .map(QueryOutput::Count)
            .ok_or_else(|| CacheError::Decode(format!("invalid count {n}"))),
        (query, _) => Err(CacheError::Decode(format!(
            "payload shape does not match {} query",
            query.collection()
        ))),
    }
}

fn to_document(value: Value) -> Result<Document, CacheError> {
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(CacheError::Decode(format!(
            "expected document, found {:?}",
            other.element_type()
        ))),
        Err(e) => Err(CacheError::Decode(e.to_string())),
    }
}

//! Canonical JSON and content identity.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::Result;

/// Field that carries a record's content id on read.
pub const ID_FIELD: &str = "id";

/// Recursively order object keys.
#[must_use]
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize a document into canonical JSON bytes with deterministic key order.
///
/// # Errors
///
/// Returns error if the document cannot be written as JSON.
pub fn to_canonical_json_bytes(value: &Value) -> Result<Vec<u8>> {
    let canonical = canonicalize(value.clone());
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonical)?;
    Ok(bytes)
}

/// Remove top-level fields from an object document. Non-objects are untouched.
pub fn strip_fields(doc: &mut Value, fields: &[&str]) {
    if let Value::Object(map) = doc {
        for field in fields {
            map.remove(*field);
        }
    }
}

/// Content id of a document: SHA-256 over its canonical JSON, ignoring the
/// `id` field and the given bookkeeping fields.
///
/// # Errors
///
/// Returns error if the document cannot be serialized.
pub fn content_id(doc: &Value, ignore: &[&str]) -> Result<String> {
    let mut doc = doc.clone();
    strip_fields(&mut doc, &[ID_FIELD]);
    strip_fields(&mut doc, ignore);
    let digest = Sha256::digest(to_canonical_json_bytes(&doc)?);
    Ok(format!("{digest:x}"))
}

/// Top-level fields whose values differ between two object documents,
/// in sorted order. Fields in `ignore` are skipped.
#[must_use]
pub fn differing_fields(a: &Value, b: &Value, ignore: &[&str]) -> Vec<String> {
    let empty = Map::new();
    let a = a.as_object().unwrap_or(&empty);
    let b = b.as_object().unwrap_or(&empty);

    let mut fields: Vec<String> = a
        .keys()
        .chain(b.keys())
        .filter(|key| !ignore.contains(&key.as_str()))
        .filter(|key| a.get(*key) != b.get(*key))
        .cloned()
        .collect();
    fields.sort();
    fields.dedup();
    fields
}

//! # Cache Key Derivation
//!
//! Turns a resource type plus a params object into a stable string key.
//!
//! Params are canonicalized before hashing (object keys sorted at every depth), so two
//! structurally equal params produce the same key whatever order their fields were
//! inserted in. When a resource declares an included-fields whitelist, only those
//! top-level fields feed the hash.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Derives the cache key for `resource_type` and `params`.
///
/// The key has the form `<resource_type>:<sha256 hex>`. Params that are not a JSON
/// object are hashed whole; the whitelist only applies to objects.
pub fn derive_key(resource_type: &str, params: &Value, included_fields: Option<&[&str]>) -> String {
    let selected = select_fields(params, included_fields);
    let canonical = canonicalize(&selected);

    let mut hasher = Sha256::new();
    hasher.update(resource_type.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.to_string().as_bytes());

    format!("{}:{}", resource_type, hex::encode(hasher.finalize()))
}

fn select_fields(params: &Value, included_fields: Option<&[&str]>) -> Value {
    match (params, included_fields) {
        (Value::Object(map), Some(fields)) => Value::Object(
            fields
                .iter()
                .filter_map(|field| map.get(*field).map(|v| ((*field).to_string(), v.clone())))
                .collect(),
        ),
        _ => params.clone(),
    }
}

/// Rebuilds `value` with object keys inserted in sorted order.
///
/// `serde_json::Map` keeps insertion order when the `preserve_order` feature is on
/// anywhere in the dependency graph, so sorting is done explicitly.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

//! Tamper-evident integrity digests for EVV records (spec.md §4.4).
//!
//! Canonical serialization: sort keys lexicographically, encode scalars
//! unambiguously (ISO-8601 UTC timestamps, lat/lon to fixed 6 decimals,
//! booleans as `true`/`false`), exclude the checksum field itself.

use serde_json::Value;

use shared::crypto::sha256_hex;

/// Recursively rewrites a JSON value into canonical form: object keys
/// sorted, floats formatted to 6 decimals, everything else left as-is.
/// `serde_json::Map` with the `preserve_order` feature disabled already
/// sorts keys on `to_string`, but we normalize explicitly so canonicalization
/// doesn't depend on that build flag.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => {
            if n.is_f64() {
                Value::String(format!("{:.6}", n.as_f64().unwrap()))
            } else {
                Value::Number(n.clone())
            }
        }
        other => other.clone(),
    }
}

/// Canonical JSON string for a value, with the checksum field (if any)
/// removed before serialization.
pub fn canonical_string(value: &Value, exclude_field: Option<&str>) -> String {
    let mut value = canonicalize(value);
    if let (Some(field), Value::Object(map)) = (exclude_field, &mut value) {
        map.remove(field);
    }
    serde_json::to_string(&value).expect("canonicalized JSON is always serializable")
}

/// SHA-256 hex digest of a value's canonical serialization.
pub fn integrity_digest(value: &Value, exclude_field: Option<&str>) -> String {
    sha256_hex(&canonical_string(value, exclude_field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalization_sorts_object_keys() {
        let value = json!({"b": 1, "a": 2});
        let canonical = canonical_string(&value, None);
        assert_eq!(canonical, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn floats_are_formatted_to_six_decimals() {
        let value = json!({"latitude": 30.2672});
        let canonical = canonical_string(&value, None);
        assert_eq!(canonical, r#"{"latitude":"30.267200"}"#);
    }

    #[test]
    fn same_data_different_key_order_yields_same_digest() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(integrity_digest(&a, None), integrity_digest(&b, None));
    }

    #[test]
    fn excluded_field_does_not_affect_digest() {
        let a = json!({"x": 1, "checksum": "irrelevant-a"});
        let b = json!({"x": 1, "checksum": "irrelevant-b"});
        assert_eq!(
            integrity_digest(&a, Some("checksum")),
            integrity_digest(&b, Some("checksum"))
        );
    }

    #[test]
    fn different_data_yields_different_digest() {
        let a = json!({"x": 1});
        let b = json!({"x": 2});
        assert_ne!(integrity_digest(&a, None), integrity_digest(&b, None));
    }
}

//! Canonical JSON serialization and the cache-key digest shared by
//! [`crate::authorizer::RemoteAuthorizer`], [`crate::authenticator::RemoteRequestHeadersAuthenticator`],
//! and [`crate::authorizer::AuthorizerFactory`]'s dedup memo.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest of a request's canonical JSON form. Equivalent
/// requests produce identical bytes and thus identical keys.
pub type CacheKey = [u8; 32];

/// Recursively sort object keys so that structurally-equal trees serialize
/// to identical bytes regardless of field insertion order.
///
/// `serde_json` (with the `preserve_order` feature this workspace enables
/// elsewhere) otherwise serializes objects in insertion order, which is not
/// a stable property of the value itself.
pub fn canonicalize(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut entries: Vec<(&String, &Value)> = map.iter().collect();
			entries.sort_by(|a, b| a.0.cmp(b.0));
			let mut out = serde_json::Map::new();
			for (k, v) in entries {
				out.insert(k.clone(), canonicalize(v));
			}
			Value::Object(out)
		}
		Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
		other => other.clone(),
	}
}

/// Serialize `value` to its canonical JSON representation, then hash it.
pub fn digest_value(value: impl Serialize) -> CacheKey {
	let value = serde_json::to_value(value).unwrap_or(Value::Null);
	let canonical = canonicalize(&value);
	let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
	let mut hasher = Sha256::new();
	hasher.update(&bytes);
	hasher.finalize().into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn key_order_does_not_affect_digest() {
		let a = json!({"b": 1, "a": 2});
		let b = json!({"a": 2, "b": 1});
		assert_eq!(digest_value(a), digest_value(b));
	}

	#[test]
	fn different_values_produce_different_digests() {
		let a = json!({"a": 1});
		let b = json!({"a": 2});
		assert_ne!(digest_value(a), digest_value(b));
	}

	#[test]
	fn nested_object_key_order_is_canonicalized() {
		let a = json!({"outer": {"y": 1, "x": 2}});
		let b = json!({"outer": {"x": 2, "y": 1}});
		assert_eq!(digest_value(a), digest_value(b));
	}
}

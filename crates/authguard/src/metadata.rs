//! Authentication metadata: an immutable tri-view (raw, public, tracing
//! attributes) over a single JSON-like tree, plus its proto round-trip.

use authguard_proto::v1::tracing_attribute::Value as WireAttrValue;
use authguard_proto::{AuthenticationMetadataProto, TracingAttribute};
use serde_json::Value;

/// A single scalar-valued tracing attribute, exported with an `auth.` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct TracingAttr {
	pub key: String,
	pub value: TracingAttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TracingAttrValue {
	String(String),
	Bool(bool),
	Int(i64),
	Double(f64),
}

/// Immutable authentication metadata, derived from a single raw JSON tree.
///
/// Never mutated after construction. Absence of metadata on a
/// [`crate::context::RequestContext`] is represented by
/// [`AuthenticationMetadata::default`], never by an `Option` that callers
/// must unwrap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticationMetadata {
	raw: Value,
}

impl AuthenticationMetadata {
	/// Construct from an arbitrary JSON-marshallable raw tree.
	pub fn from_raw(raw: Value) -> Self {
		AuthenticationMetadata { raw }
	}

	/// Construct from the structured proto form, reassembling the raw tree
	/// from its `public`/`private`/`tracing_attributes` projections.
	pub fn from_proto(p: &AuthenticationMetadataProto) -> Self {
		let mut map = serde_json::Map::new();

		if let Some(public) = &p.public {
			map.insert("public".to_string(), prost_struct_to_json(public));
		}
		if let Some(private) = &p.private {
			if let Value::Object(private_map) = prost_struct_to_json(private) {
				for (k, v) in private_map {
					map.insert(k, v);
				}
			}
		}
		if !p.tracing_attributes.is_empty() {
			let attrs: Vec<Value> = p
				.tracing_attributes
				.iter()
				.filter_map(tracing_attribute_to_json)
				.collect();
			map.insert("tracingAttributes".to_string(), Value::Array(attrs));
		}

		AuthenticationMetadata { raw: Value::Object(map) }
	}

	/// The full raw tree, or `Value::Null` if this is the zero value.
	pub fn raw(&self) -> &Value {
		&self.raw
	}

	/// The subtree found under the `public` key, plus whether a `public` key
	/// is present at all (even if its value is `null`).
	pub fn public_proto(&self) -> (Value, bool) {
		match self.raw.as_object() {
			Some(obj) => match obj.get("public") {
				Some(v) => (v.clone(), true),
				None => (Value::Null, false),
			},
			None => (Value::Null, false),
		}
	}

	/// Reassemble the structured proto form: `public` + `tracingAttributes`
	/// surfaced explicitly, everything else folded into `private`.
	///
	/// `from_proto(p).full_proto() == p` for canonical `p`.
	pub fn full_proto(&self) -> AuthenticationMetadataProto {
		let obj = self.raw.as_object();

		let public = obj
			.and_then(|o| o.get("public"))
			.map(json_to_prost_struct)
			.unwrap_or_default();

		let mut private_map = serde_json::Map::new();
		if let Some(o) = obj {
			for (k, v) in o {
				if k == "public" || k == "tracingAttributes" {
					continue;
				}
				private_map.insert(k.clone(), v.clone());
			}
		}
		let private = json_to_prost_struct(&Value::Object(private_map));

		let tracing_attributes = self
			.tracing_attributes()
			.into_iter()
			.map(|a| TracingAttribute {
				key: a.key,
				value: Some(match a.value {
					TracingAttrValue::String(s) => WireAttrValue::StringValue(s),
					TracingAttrValue::Bool(b) => WireAttrValue::BoolValue(b),
					TracingAttrValue::Int(i) => WireAttrValue::IntValue(i),
					TracingAttrValue::Double(d) => WireAttrValue::DoubleValue(d),
				}),
			})
			.collect();

		AuthenticationMetadataProto {
			public: Some(public),
			private: Some(private),
			tracing_attributes,
		}
	}

	/// Ordered list of scalar-valued tracing attributes. Non-scalar or
	/// malformed entries are silently dropped.
	pub fn tracing_attributes(&self) -> Vec<TracingAttr> {
		let Some(obj) = self.raw.as_object() else {
			return Vec::new();
		};
		let Some(Value::Array(entries)) = obj.get("tracingAttributes") else {
			return Vec::new();
		};

		entries
			.iter()
			.filter_map(|entry| {
				let entry = entry.as_object()?;
				let key = entry.get("key")?.as_str()?.to_string();
				let value = entry.get("value")?;
				let value = json_scalar_to_attr_value(value)?;
				Some(TracingAttr { key: format!("auth.{key}"), value })
			})
			.collect()
	}
}

fn json_scalar_to_attr_value(v: &Value) -> Option<TracingAttrValue> {
	match v {
		Value::String(s) => Some(TracingAttrValue::String(s.clone())),
		Value::Bool(b) => Some(TracingAttrValue::Bool(*b)),
		Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				Some(TracingAttrValue::Int(i))
			} else {
				n.as_f64().map(TracingAttrValue::Double)
			}
		}
		_ => None,
	}
}

fn tracing_attribute_to_json(attr: &TracingAttribute) -> Option<Value> {
	let value = match attr.value.as_ref()? {
		WireAttrValue::StringValue(s) => Value::String(s.clone()),
		WireAttrValue::BoolValue(b) => Value::Bool(*b),
		WireAttrValue::IntValue(i) => Value::Number((*i).into()),
		WireAttrValue::DoubleValue(d) => serde_json::Number::from_f64(*d).map(Value::Number)?,
	};
	let mut entry = serde_json::Map::new();
	entry.insert("key".to_string(), Value::String(attr.key.clone()));
	entry.insert("value".to_string(), value);
	Some(Value::Object(entry))
}

fn prost_struct_to_json(s: &prost_wkt_types::Struct) -> Value {
	serde_json::to_value(s).unwrap_or(Value::Null)
}

fn json_to_prost_struct(v: &Value) -> prost_wkt_types::Struct {
	serde_json::from_value(v.clone()).unwrap_or_default()
}

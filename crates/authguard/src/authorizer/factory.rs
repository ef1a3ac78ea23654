use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Authorizer, JmespathAuthorizer, StaticAuthorizer};
use crate::canonical::canonicalize;
pub use crate::error::ConfigError;
use crate::instance_name::{InstanceName, InstanceNameTrie};

/// A configuration sum type with exactly one variant set: an
/// externally-tagged enum over the four authorizer kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum AuthorizerConfig {
	Allow,
	Deny,
	InstanceNamePrefix { allowed_prefixes: Vec<String> },
	JmespathExpression(String),
}

/// Builds [`Authorizer`]s from [`AuthorizerConfig`], deduplicating identical
/// configs so they share one instance (and, for `RemoteAuthorizer`
/// variants built elsewhere and wrapped by callers, one cache).
///
/// Unknown or malformed configuration shapes are rejected at
/// deserialization time by `serde` itself, since `AuthorizerConfig` is a
/// plain Rust enum rather than a loosely-typed bag of optional fields.
pub struct AuthorizerFactory {
	memo: Mutex<HashMap<String, Arc<dyn Authorizer>>>,
}

impl AuthorizerFactory {
	pub fn new() -> Self {
		AuthorizerFactory { memo: Mutex::new(HashMap::new()) }
	}

	/// Build (or return the memoized instance for) the authorizer described
	/// by `config`.
	pub fn build(&self, config: &AuthorizerConfig) -> Result<Arc<dyn Authorizer>, ConfigError> {
		let key = memo_key(config);

		if let Some(existing) = self.memo.lock().get(&key) {
			debug!("reusing memoized authorizer for config");
			return Ok(existing.clone());
		}

		let authorizer = construct(config)?;

		// Another caller may have raced us to build the same config; the
		// loser's instance is dropped in favor of whichever landed first, so
		// every caller who built this config ends up sharing one.
		let mut memo = self.memo.lock();
		Ok(memo.entry(key).or_insert(authorizer).clone())
	}
}

impl Default for AuthorizerFactory {
	fn default() -> Self {
		Self::new()
	}
}

fn memo_key(config: &AuthorizerConfig) -> String {
	let value = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
	serde_json::to_string(&canonicalize(&value)).unwrap_or_default()
}

fn construct(config: &AuthorizerConfig) -> Result<Arc<dyn Authorizer>, ConfigError> {
	match config {
		AuthorizerConfig::Allow => Ok(Arc::new(StaticAuthorizer::allow_all())),
		AuthorizerConfig::Deny => Ok(Arc::new(StaticAuthorizer::deny_all())),
		AuthorizerConfig::InstanceNamePrefix { allowed_prefixes } => {
			let mut trie = InstanceNameTrie::new();
			for prefix in allowed_prefixes {
				let name = InstanceName::parse(prefix).map_err(|source| ConfigError::InvalidPrefix {
					prefix: prefix.clone(),
					source,
				})?;
				trie.set(&name);
			}
			Ok(Arc::new(StaticAuthorizer::new(move |name| trie.contains_prefix(name))))
		}
		AuthorizerConfig::JmespathExpression(expr) => {
			let authorizer = JmespathAuthorizer::compile(expr)
				.map_err(|e| ConfigError::InvalidExpression(e.to_string()))?;
			Ok(Arc::new(authorizer))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn allow_config_permits_everything() {
		let factory = AuthorizerFactory::new();
		let authorizer = factory.build(&AuthorizerConfig::Allow).unwrap();
		let ctx = crate::context::RequestContext::new();
		let results = authorizer.authorize(&ctx, &[InstanceName::parse("x").unwrap()]).await;
		assert!(results[0].is_ok());
	}

	#[test]
	fn identical_configs_are_deduplicated() {
		let factory = AuthorizerFactory::new();
		let config = AuthorizerConfig::InstanceNamePrefix { allowed_prefixes: vec!["a".to_string()] };
		let first = factory.build(&config).unwrap();
		let second = factory.build(&config).unwrap();
		assert!(Arc::ptr_eq(&first, &second));
	}

	#[test]
	fn invalid_prefix_is_rejected() {
		let factory = AuthorizerFactory::new();
		let config = AuthorizerConfig::InstanceNamePrefix { allowed_prefixes: vec!["..".to_string()] };
		assert!(factory.build(&config).is_err());
	}

	#[test]
	fn invalid_jmespath_expression_is_rejected() {
		let factory = AuthorizerFactory::new();
		let config = AuthorizerConfig::JmespathExpression("(((".to_string());
		assert!(factory.build(&config).is_err());
	}
}

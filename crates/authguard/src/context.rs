//! The Rust stand-in for an ambient `context.Context`: a plain value bundling
//! attached authentication metadata with a cooperative-cancellation signal,
//! threaded explicitly through every `authorize`/`authenticate` call.

use tokio_util::sync::CancellationToken;

use crate::metadata::AuthenticationMetadata;

/// Carries per-request state across an `authorize`/`authenticate` call.
///
/// Cloning is cheap: the metadata is a `serde_json::Value` clone and the
/// cancellation token is a child of the original, so cancelling a clone
/// never affects its parent but cancelling the parent cancels every clone.
#[derive(Debug, Clone)]
pub struct RequestContext {
	metadata: AuthenticationMetadata,
	cancellation: CancellationToken,
}

impl RequestContext {
	/// A fresh context with no attached metadata and a standalone
	/// cancellation token.
	pub fn new() -> Self {
		RequestContext {
			metadata: AuthenticationMetadata::default(),
			cancellation: CancellationToken::new(),
		}
	}

	/// A context that is cancelled when `parent` is cancelled, in addition
	/// to its own lifetime.
	pub fn child_of(parent: &CancellationToken) -> Self {
		RequestContext {
			metadata: AuthenticationMetadata::default(),
			cancellation: parent.child_token(),
		}
	}

	/// Attach `metadata`, returning the updated context. Allocation-free
	/// beyond the `AuthenticationMetadata` value itself.
	pub fn with_metadata(mut self, metadata: AuthenticationMetadata) -> Self {
		self.metadata = metadata;
		self
	}

	/// The attached metadata, or the zero value if none has been attached.
	pub fn metadata(&self) -> &AuthenticationMetadata {
		&self.metadata
	}

	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancellation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancellation.is_cancelled()
	}
}

impl Default for RequestContext {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn default_context_has_no_metadata() {
		let ctx = RequestContext::new();
		assert_eq!(ctx.metadata().raw(), &serde_json::Value::Null);
	}

	#[test]
	fn with_metadata_replaces_attached_value() {
		let ctx = RequestContext::new()
			.with_metadata(AuthenticationMetadata::from_raw(json!({"public": {"user": "alice"}})));
		let (public, present) = ctx.metadata().public_proto();
		assert!(present);
		assert_eq!(public, json!({"user": "alice"}));
	}

	#[test]
	fn cancelling_parent_cancels_child() {
		let parent = CancellationToken::new();
		let ctx = RequestContext::child_of(&parent);
		assert!(!ctx.is_cancelled());
		parent.cancel();
		assert!(ctx.is_cancelled());
	}
}

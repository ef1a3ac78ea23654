use async_trait::async_trait;

use super::{permission_denied, Authorizer};
use crate::context::RequestContext;
use crate::instance_name::InstanceName;

/// Authorizes purely on a predicate over the instance name, with no I/O.
///
/// Backs the `allow`, `deny`, and `instanceNamePrefix` [`super::AuthorizerConfig`]
/// variants.
pub struct StaticAuthorizer {
	matcher: Box<dyn Fn(&InstanceName) -> bool + Send + Sync>,
	denied: tonic::Status,
}

impl StaticAuthorizer {
	pub fn new(matcher: impl Fn(&InstanceName) -> bool + Send + Sync + 'static) -> Self {
		StaticAuthorizer { matcher: Box::new(matcher), denied: permission_denied() }
	}

	pub fn allow_all() -> Self {
		Self::new(|_| true)
	}

	pub fn deny_all() -> Self {
		Self::new(|_| false)
	}
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
	async fn authorize(
		&self,
		_ctx: &RequestContext,
		names: &[InstanceName],
	) -> Vec<Result<(), tonic::Status>> {
		names
			.iter()
			.map(|n| if (self.matcher)(n) { Ok(()) } else { Err(self.denied.clone()) })
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names(strs: &[&str]) -> Vec<InstanceName> {
		strs.iter().map(|s| InstanceName::parse(s).unwrap()).collect()
	}

	#[tokio::test]
	async fn result_matches_predicate_for_every_name() {
		let authorizer = StaticAuthorizer::new(|n| n.to_string() == "allowed");
		let ctx = RequestContext::new();
		let results = authorizer.authorize(&ctx, &names(&["allowed", "other"])).await;
		assert!(results[0].is_ok());
		assert_eq!(results[1].as_ref().unwrap_err().code(), tonic::Code::PermissionDenied);
	}

	#[tokio::test]
	async fn allow_all_permits_everything() {
		let authorizer = StaticAuthorizer::allow_all();
		let ctx = RequestContext::new();
		let results = authorizer.authorize(&ctx, &names(&["a", "b"])).await;
		assert!(results.iter().all(Result::is_ok));
	}
}

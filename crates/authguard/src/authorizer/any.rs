use std::sync::Arc;

use async_trait::async_trait;
use tonic::Code;

use super::Authorizer;
use crate::context::RequestContext;
use crate::instance_name::InstanceName;

/// Fan-out composite: permits a position the moment any backend permits it.
///
/// A clean `PermissionDenied` from one backend is a candidate for later
/// backends to overturn. Any other outcome (success, or a non-`PermissionDenied`
/// infrastructure error) freezes that position: later backends are not
/// consulted for it, since either it's already decided or the backend's
/// opinion was ambiguous enough that a later deny shouldn't silently replace it.
pub struct AnyAuthorizer {
	backends: Vec<Arc<dyn Authorizer>>,
}

impl AnyAuthorizer {
	pub fn new(backends: Vec<Arc<dyn Authorizer>>) -> Self {
		AnyAuthorizer { backends }
	}
}

#[async_trait]
impl Authorizer for AnyAuthorizer {
	async fn authorize(
		&self,
		ctx: &RequestContext,
		names: &[InstanceName],
	) -> Vec<Result<(), tonic::Status>> {
		if self.backends.is_empty() {
			return names.iter().map(|_| Err(super::permission_denied())).collect();
		}
		if self.backends.len() == 1 {
			return self.backends[0].authorize(ctx, names).await;
		}

		let mut results = self.backends[0].authorize(ctx, names).await;

		let mut candidates: Vec<usize> = results
			.iter()
			.enumerate()
			.filter_map(|(i, r)| is_permission_denied(r).then_some(i))
			.collect();

		for backend in &self.backends[1..] {
			if candidates.is_empty() {
				break;
			}
			let candidate_names: Vec<InstanceName> =
				candidates.iter().map(|&i| names[i].clone()).collect();
			let sub_results = backend.authorize(ctx, &candidate_names).await;

			let mut still_candidate = Vec::with_capacity(candidates.len());
			for (pos, original_index) in candidates.into_iter().enumerate() {
				let r = &sub_results[pos];
				if is_permission_denied(r) {
					still_candidate.push(original_index);
				} else {
					results[original_index] = sub_results[pos].clone();
				}
			}
			candidates = still_candidate;
		}

		results
	}
}

fn is_permission_denied(r: &Result<(), tonic::Status>) -> bool {
	matches!(r, Err(status) if status.code() == Code::PermissionDenied)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::authorizer::StaticAuthorizer;

	fn names(strs: &[&str]) -> Vec<InstanceName> {
		strs.iter().map(|s| InstanceName::parse(s).unwrap()).collect()
	}

	#[tokio::test]
	async fn zero_backends_denies_every_position() {
		let any = AnyAuthorizer::new(vec![]);
		let ctx = RequestContext::new();
		let results = any.authorize(&ctx, &names(&["a", "b"])).await;
		assert!(results.iter().all(|r| r.is_err()));
	}

	#[tokio::test]
	async fn single_backend_passes_through() {
		let any = AnyAuthorizer::new(vec![Arc::new(StaticAuthorizer::allow_all())]);
		let ctx = RequestContext::new();
		let results = any.authorize(&ctx, &names(&["a"])).await;
		assert!(results[0].is_ok());
	}

	#[tokio::test]
	async fn later_backend_overturns_earlier_deny() {
		let any = AnyAuthorizer::new(vec![
			Arc::new(StaticAuthorizer::deny_all()),
			Arc::new(StaticAuthorizer::allow_all()),
		]);
		let ctx = RequestContext::new();
		let results = any.authorize(&ctx, &names(&["a"])).await;
		assert!(results[0].is_ok());
	}

	#[tokio::test]
	async fn unavailable_from_first_backend_freezes_position() {
		struct Unavailable;
		#[async_trait]
		impl Authorizer for Unavailable {
			async fn authorize(
				&self,
				_ctx: &RequestContext,
				names: &[InstanceName],
			) -> Vec<Result<(), tonic::Status>> {
				names.iter().map(|_| Err(tonic::Status::unavailable("down"))).collect()
			}
		}

		let any = AnyAuthorizer::new(vec![
			Arc::new(Unavailable),
			Arc::new(StaticAuthorizer::allow_all()),
		]);
		let ctx = RequestContext::new();
		let results = any.authorize(&ctx, &names(&["a"])).await;
		assert_eq!(results[0].as_ref().unwrap_err().code(), Code::Unavailable);
	}

	#[tokio::test]
	async fn all_deny_returns_first_backends_message() {
		struct NamedDeny(&'static str);
		#[async_trait]
		impl Authorizer for NamedDeny {
			async fn authorize(
				&self,
				_ctx: &RequestContext,
				names: &[InstanceName],
			) -> Vec<Result<(), tonic::Status>> {
				names.iter().map(|_| Err(tonic::Status::permission_denied(self.0))).collect()
			}
		}

		let any = AnyAuthorizer::new(vec![Arc::new(NamedDeny("first")), Arc::new(NamedDeny("second"))]);
		let ctx = RequestContext::new();
		let results = any.authorize(&ctx, &names(&["a"])).await;
		assert_eq!(results[0].as_ref().unwrap_err().message(), "first");
	}
}

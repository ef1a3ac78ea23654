use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use authguard_proto::{authorize_response, AuthServiceClient, AuthorizeRequest, AuthorizeResponse};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tonic::transport::Channel;
use tracing::{debug, trace, warn};

use super::Authorizer;
use crate::canonical::{digest_value, CacheKey};
use crate::clock::Clock;
use crate::context::RequestContext;
use crate::eviction::EvictionSet;
use crate::instance_name::InstanceName;

/// The remote side of a `RemoteAuthorizer`: whatever actually issues the
/// `Authorize` RPC. Abstracted behind a trait so the coalescing/caching
/// state machine can be exercised against a fake backend.
#[async_trait]
pub trait AuthorizeBackend: Send + Sync {
	async fn authorize(&self, request: AuthorizeRequest) -> Result<AuthorizeResponse, tonic::Status>;
}

/// An [`AuthorizeBackend`] backed by a real `tonic` gRPC channel.
pub struct GrpcAuthorizeBackend {
	client: AuthServiceClient<Channel>,
}

impl GrpcAuthorizeBackend {
	pub fn new(channel: Channel) -> Self {
		GrpcAuthorizeBackend { client: AuthServiceClient::new(channel) }
	}
}

#[async_trait]
impl AuthorizeBackend for GrpcAuthorizeBackend {
	async fn authorize(&self, request: AuthorizeRequest) -> Result<AuthorizeResponse, tonic::Status> {
		let mut client = self.client.clone();
		Ok(client.authorize(request).await?.into_inner())
	}
}

#[derive(Clone, Debug)]
enum Verdict {
	Allow,
	Deny(String),
}

impl Verdict {
	fn into_result(self) -> Result<(), tonic::Status> {
		match self {
			Verdict::Allow => Ok(()),
			Verdict::Deny(message) => Err(tonic::Status::permission_denied(message)),
		}
	}
}

struct CachedVerdict {
	verdict: Verdict,
	expires_at: SystemTime,
}

#[derive(Default)]
struct CacheState {
	cached: HashMap<CacheKey, CachedVerdict>,
	pending: HashMap<CacheKey, broadcast::Sender<()>>,
	eviction: EvictionSet<CacheKey>,
}

/// Delegates authorization decisions to a remote gRPC service, fronted by a
/// single-flight, LRU-bounded cache.
///
/// See the module-level design notes in the crate root for the full
/// coalescing state machine; in short: at most one RPC is ever in flight per
/// cache key, only successful responses are cached, and a cancelled waiter
/// never affects the in-flight call or other waiters.
pub struct RemoteAuthorizer {
	backend: Arc<dyn AuthorizeBackend>,
	scope: Bytes,
	clock: Arc<dyn Clock>,
	max_cache_size: usize,
	state: Mutex<CacheState>,
}

impl RemoteAuthorizer {
	pub fn new(
		backend: Arc<dyn AuthorizeBackend>,
		scope: Bytes,
		clock: Arc<dyn Clock>,
		max_cache_size: usize,
	) -> Self {
		RemoteAuthorizer {
			backend,
			scope,
			clock,
			max_cache_size,
			state: Mutex::new(CacheState::default()),
		}
	}

	async fn authorize_one(
		&self,
		ctx: &RequestContext,
		name: &InstanceName,
	) -> Result<(), tonic::Status> {
		let request = AuthorizeRequest {
			authentication_metadata: Some(ctx.metadata().full_proto()),
			scope: self.scope.to_vec(),
			instance_name: name.to_string(),
		};

		if self.max_cache_size == 0 {
			return self.call_backend(request).await.into_result();
		}

		let key = digest_value(&request);

		loop {
			enum Action {
				Return(Verdict),
				Wait(broadcast::Receiver<()>),
				Coordinate,
			}

			let action = {
				let mut state = self.state.lock();
				let now = self.clock.now();
				if let Some(entry) = state.cached.get(&key) {
					if entry.expires_at > now {
						let verdict = entry.verdict.clone();
						state.eviction.touch(&key);
						trace!(instance_name = %name, "authorize cache hit");
						Action::Return(verdict)
					} else if let Some(sender) = state.pending.get(&key) {
						Action::Wait(sender.subscribe())
					} else {
						state.cached.remove(&key);
						state.eviction.remove_key(&key);
						let (sender, _) = broadcast::channel(1);
						state.pending.insert(key, sender);
						Action::Coordinate
					}
				} else if let Some(sender) = state.pending.get(&key) {
					Action::Wait(sender.subscribe())
				} else {
					let (sender, _) = broadcast::channel(1);
					state.pending.insert(key, sender);
					Action::Coordinate
				}
			};

			match action {
				Action::Return(verdict) => return verdict.into_result(),
				Action::Wait(mut receiver) => {
					tokio::select! {
						_ = ctx.cancellation().cancelled() => {
							trace!(instance_name = %name, "authorize wait cancelled");
							return Err(tonic::Status::cancelled("authorization request cancelled"));
						}
						_ = receiver.recv() => {}
					}
					let mut state = self.state.lock();
					if let Some(entry) = state.cached.get(&key) {
						let verdict = entry.verdict.clone();
						state.eviction.touch(&key);
						return verdict.into_result();
					}
					// Coordinator failed; retry as a fresh coordinator.
					debug!(instance_name = %name, "coordinator failed, retrying as coordinator");
				}
				Action::Coordinate => {
					trace!(instance_name = %name, "issuing remote authorize call");
					let result = self.call_backend(request.clone()).await;

					let mut state = self.state.lock();
					let sender = state.pending.remove(&key);

					if let VerdictOutcome::Ok(verdict, expires_at) = &result {
						state.cached.insert(key, CachedVerdict { verdict: verdict.clone(), expires_at: *expires_at });
						if !state.eviction.contains(&key) {
							state.eviction.insert(key);
						}
						while state.cached.len() > self.max_cache_size {
							let victim = state.eviction.remove();
							state.cached.remove(&victim);
						}
					}
					drop(state);

					if let Some(sender) = sender {
						let _ = sender.send(());
					}

					return result.into_result();
				}
			}
		}
	}

	async fn call_backend(&self, request: AuthorizeRequest) -> VerdictOutcome {
		let response = match self.backend.authorize(request).await {
			Ok(response) => response,
			Err(status) => {
				warn!("remote authorize call failed: {status}");
				return VerdictOutcome::Err(tonic::Status::permission_denied(format!(
					"Remote authorization failed: {status}"
				)));
			}
		};

		let verdict = match response.verdict {
			Some(authorize_response::Verdict::Allow(_)) => Verdict::Allow,
			Some(authorize_response::Verdict::Deny(message)) => Verdict::Deny(message),
			None => {
				warn!("remote authorize response missing verdict");
				return VerdictOutcome::Err(tonic::Status::permission_denied("Invalid authorize verdict"));
			}
		};

		match crate::timestamp::parse_expiration(response.cache_expiration_time.as_ref()) {
			Ok(expires_at) => VerdictOutcome::Ok(verdict, expires_at),
			Err(()) => {
				warn!("remote authorize response carried an invalid expiration timestamp");
				VerdictOutcome::Err(tonic::Status::permission_denied(
					"Invalid authorization expiration time",
				))
			}
		}
	}
}

enum VerdictOutcome {
	Ok(Verdict, SystemTime),
	Err(tonic::Status),
}

impl VerdictOutcome {
	fn into_result(self) -> Result<(), tonic::Status> {
		match self {
			VerdictOutcome::Ok(verdict, _) => verdict.into_result(),
			VerdictOutcome::Err(status) => Err(status),
		}
	}
}

#[async_trait]
impl Authorizer for RemoteAuthorizer {
	async fn authorize(
		&self,
		ctx: &RequestContext,
		names: &[InstanceName],
	) -> Vec<Result<(), tonic::Status>> {
		let mut results = Vec::with_capacity(names.len());
		for name in names {
			results.push(self.authorize_one(ctx, name).await);
		}
		results
	}
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;

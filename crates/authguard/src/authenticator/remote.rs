use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use authguard_proto::{authenticate_response, AuthServiceClient, AuthenticateRequest, AuthenticateResponse, HeaderValues};
use bytes::Bytes;
use http::HeaderName;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tonic::transport::Channel;
use tracing::{debug, trace, warn};

use super::Authenticator;
use crate::canonical::{digest_value, CacheKey};
use crate::clock::Clock;
use crate::context::RequestContext;
use crate::error::ConfigError;
use crate::eviction::EvictionSet;
use crate::metadata::AuthenticationMetadata;

/// Whatever actually issues the `Authenticate` RPC, abstracted the same way
/// [`crate::authorizer::RemoteAuthorizer`] abstracts [`crate::authorizer::remote::AuthorizeBackend`].
#[async_trait]
pub trait AuthenticateBackend: Send + Sync {
	async fn authenticate(
		&self,
		request: AuthenticateRequest,
	) -> Result<AuthenticateResponse, tonic::Status>;
}

pub struct GrpcAuthenticateBackend {
	client: AuthServiceClient<Channel>,
}

impl GrpcAuthenticateBackend {
	pub fn new(channel: Channel) -> Self {
		GrpcAuthenticateBackend { client: AuthServiceClient::new(channel) }
	}
}

#[async_trait]
impl AuthenticateBackend for GrpcAuthenticateBackend {
	async fn authenticate(
		&self,
		request: AuthenticateRequest,
	) -> Result<AuthenticateResponse, tonic::Status> {
		let mut client = self.client.clone();
		Ok(client.authenticate(request).await?.into_inner())
	}
}

#[derive(Clone, Debug)]
enum Verdict {
	Allow(AuthenticationMetadata),
	Deny(String),
}

impl Verdict {
	fn into_result(self) -> Result<AuthenticationMetadata, tonic::Status> {
		match self {
			Verdict::Allow(metadata) => Ok(metadata),
			Verdict::Deny(message) => Err(tonic::Status::unauthenticated(message)),
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

enum VerdictOutcome {
	Ok(Verdict, SystemTime),
	Err(tonic::Status),
}

impl VerdictOutcome {
	fn into_result(self) -> Result<AuthenticationMetadata, tonic::Status> {
		match self {
			VerdictOutcome::Ok(verdict, _) => verdict.into_result(),
			VerdictOutcome::Err(status) => Err(status),
		}
	}
}

/// Authenticates by forwarding a fixed set of request headers to a remote
/// gRPC service, fronted by the same single-flight LRU cache architecture
/// as [`crate::authorizer::RemoteAuthorizer`].
pub struct RemoteRequestHeadersAuthenticator {
	backend: Arc<dyn AuthenticateBackend>,
	scope: Bytes,
	header_keys: Vec<HeaderName>,
	clock: Arc<dyn Clock>,
	max_cache_size: usize,
	state: Mutex<CacheState>,
}

impl RemoteRequestHeadersAuthenticator {
	/// `header_keys` must already be in canonical form (`http::HeaderName`'s
	/// own lowercase-ASCII canonicalization); non-canonical keys are
	/// rejected here rather than silently normalized, since a caller who
	/// passes `"X-User"` almost certainly meant to configure the header the
	/// backend actually sees on the wire, `"x-user"`.
	pub fn new(
		backend: Arc<dyn AuthenticateBackend>,
		scope: Bytes,
		header_keys: Vec<String>,
		clock: Arc<dyn Clock>,
		max_cache_size: usize,
	) -> Result<Self, ConfigError> {
		let header_keys = header_keys
			.iter()
			.map(|key| validate_canonical(key))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(RemoteRequestHeadersAuthenticator {
			backend,
			scope,
			header_keys,
			clock,
			max_cache_size,
			state: Mutex::new(CacheState::default()),
		})
	}

	fn select_headers(&self, headers: &http::HeaderMap) -> HashMap<String, HeaderValues> {
		let mut selected = HashMap::new();
		for key in &self.header_keys {
			let values: Vec<String> = headers
				.get_all(key)
				.iter()
				.filter_map(|v| v.to_str().ok().map(str::to_owned))
				.collect();
			if !values.is_empty() {
				selected.insert(key.as_str().to_string(), HeaderValues { values });
			}
		}
		selected
	}

	async fn call_backend(&self, request: AuthenticateRequest) -> VerdictOutcome {
		let response = match self.backend.authenticate(request).await {
			Ok(response) => response,
			Err(status) => {
				warn!("remote authenticate call failed: {status}");
				return VerdictOutcome::Err(tonic::Status::unauthenticated(format!(
					"Remote authentication failed: {status}"
				)));
			}
		};

		let verdict = match response.verdict {
			Some(authenticate_response::Verdict::Allow(proto)) => {
				Verdict::Allow(AuthenticationMetadata::from_proto(&proto))
			}
			Some(authenticate_response::Verdict::Deny(message)) => Verdict::Deny(message),
			None => {
				warn!("remote authenticate response missing verdict");
				return VerdictOutcome::Err(tonic::Status::unauthenticated("Invalid authentication verdict"));
			}
		};

		match crate::timestamp::parse_expiration(response.cache_expiration_time.as_ref()) {
			Ok(expires_at) => VerdictOutcome::Ok(verdict, expires_at),
			Err(()) => {
				warn!("remote authenticate response carried an invalid expiration timestamp");
				VerdictOutcome::Err(tonic::Status::unauthenticated("Invalid authentication expiration time"))
			}
		}
	}
}

#[async_trait]
impl Authenticator for RemoteRequestHeadersAuthenticator {
	async fn authenticate(
		&self,
		ctx: &RequestContext,
		headers: &http::HeaderMap,
	) -> Result<AuthenticationMetadata, tonic::Status> {
		let request = AuthenticateRequest {
			request_metadata: self.select_headers(headers),
			scope: self.scope.to_vec(),
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
						trace!("authenticate cache hit");
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
							trace!("authenticate wait cancelled");
							return Err(tonic::Status::cancelled("authentication request cancelled"));
						}
						_ = receiver.recv() => {}
					}
					let mut state = self.state.lock();
					if let Some(entry) = state.cached.get(&key) {
						let verdict = entry.verdict.clone();
						state.eviction.touch(&key);
						return verdict.into_result();
					}
					debug!("coordinator failed, retrying as coordinator");
				}
				Action::Coordinate => {
					trace!("issuing remote authenticate call");
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
}

fn validate_canonical(key: &str) -> Result<HeaderName, ConfigError> {
	let canonical = HeaderName::from_str(&key.to_ascii_lowercase()).map_err(|_| {
		ConfigError::NonCanonicalHeaderKey { offending: key.to_string(), canonical: key.to_ascii_lowercase() }
	})?;
	if canonical.as_str() != key {
		return Err(ConfigError::NonCanonicalHeaderKey {
			offending: key.to_string(),
			canonical: canonical.as_str().to_string(),
		});
	}
	Ok(canonical)
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;

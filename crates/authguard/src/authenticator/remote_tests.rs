use super::*;
use crate::clock::FakeClock;
use prost_wkt_types::Struct as ProstStruct;
use std::sync::atomic::{AtomicUsize, Ordering};

fn allow_response(user: &str, expires_in_secs: i64) -> AuthenticateResponse {
	let public: ProstStruct =
		serde_json::from_value(serde_json::json!({"user": user})).unwrap();
	AuthenticateResponse {
		verdict: Some(authenticate_response::Verdict::Allow(
			authguard_proto::AuthenticationMetadataProto {
				public: Some(public),
				private: None,
				tracing_attributes: vec![],
			},
		)),
		cache_expiration_time: Some(prost_wkt_types::Timestamp { seconds: expires_in_secs, nanos: 0 }),
	}
}

struct CountingBackend {
	calls: AtomicUsize,
	response: AuthenticateResponse,
}

#[async_trait]
impl AuthenticateBackend for CountingBackend {
	async fn authenticate(
		&self,
		_request: AuthenticateRequest,
	) -> Result<AuthenticateResponse, tonic::Status> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.response.clone())
	}
}

#[test]
fn rejects_non_canonical_header_keys() {
	let backend = Arc::new(CountingBackend {
		calls: AtomicUsize::new(0),
		response: allow_response("alice", 2000),
	});
	let err = RemoteRequestHeadersAuthenticator::new(
		backend,
		Bytes::new(),
		vec!["X-User".to_string()],
		Arc::new(FakeClock::new(0)),
		10,
	)
	.unwrap_err();
	assert!(matches!(err, ConfigError::NonCanonicalHeaderKey { .. }));
}

#[tokio::test]
async fn allow_response_attaches_metadata_and_caches() {
	let clock = Arc::new(FakeClock::new(1000));
	let backend = Arc::new(CountingBackend {
		calls: AtomicUsize::new(0),
		response: allow_response("alice", 2000),
	});
	let authenticator = RemoteRequestHeadersAuthenticator::new(
		backend.clone(),
		Bytes::new(),
		vec!["x-user".to_string()],
		clock,
		10,
	)
	.unwrap();

	let mut headers = http::HeaderMap::new();
	headers.insert("x-user", "alice".parse().unwrap());
	let ctx = RequestContext::new();

	let metadata = authenticator.authenticate(&ctx, &headers).await.unwrap();
	let (public, _) = metadata.public_proto();
	assert_eq!(public, serde_json::json!({"user": "alice"}));

	authenticator.authenticate(&ctx, &headers).await.unwrap();
	assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

struct DenyingBackend;

#[async_trait]
impl AuthenticateBackend for DenyingBackend {
	async fn authenticate(
		&self,
		_request: AuthenticateRequest,
	) -> Result<AuthenticateResponse, tonic::Status> {
		Ok(AuthenticateResponse {
			verdict: Some(authenticate_response::Verdict::Deny("no such user".to_string())),
			cache_expiration_time: Some(prost_wkt_types::Timestamp { seconds: 2000, nanos: 0 }),
		})
	}
}

#[tokio::test]
async fn deny_response_surfaces_as_unauthenticated() {
	let clock = Arc::new(FakeClock::new(1000));
	let authenticator = RemoteRequestHeadersAuthenticator::new(
		Arc::new(DenyingBackend),
		Bytes::new(),
		vec![],
		clock,
		10,
	)
	.unwrap();
	let ctx = RequestContext::new();
	let result = authenticator.authenticate(&ctx, &http::HeaderMap::new()).await;
	assert_eq!(result.unwrap_err().code(), tonic::Code::Unauthenticated);
}

use super::*;
use crate::clock::FakeClock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

struct CountingBackend {
	calls: AtomicUsize,
	response: AuthorizeResponse,
}

#[async_trait]
impl AuthorizeBackend for CountingBackend {
	async fn authorize(&self, _request: AuthorizeRequest) -> Result<AuthorizeResponse, tonic::Status> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.response.clone())
	}
}

fn allow_response(expires_in_secs: i64) -> AuthorizeResponse {
	AuthorizeResponse {
		verdict: Some(authorize_response::Verdict::Allow(true)),
		cache_expiration_time: Some(prost_wkt_types::Timestamp { seconds: expires_in_secs, nanos: 0 }),
	}
}

#[tokio::test]
async fn cache_hit_avoids_second_backend_call() {
	let clock = Arc::new(FakeClock::new(1000));
	let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), response: allow_response(1002) });
	let authorizer = RemoteAuthorizer::new(backend.clone(), Bytes::new(), clock.clone(), 100);
	let ctx = RequestContext::new();
	let name = InstanceName::parse("allow").unwrap();

	authorizer.authorize_one(&ctx, &name).await.unwrap();
	assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

	clock.set(1001);
	authorizer.authorize_one(&ctx, &name).await.unwrap();
	assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

	clock.set(1002);
	authorizer.authorize_one(&ctx, &name).await.unwrap();
	assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn zero_max_cache_size_calls_backend_every_time() {
	let clock = Arc::new(FakeClock::new(1000));
	let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), response: allow_response(2000) });
	let authorizer = RemoteAuthorizer::new(backend.clone(), Bytes::new(), clock, 0);
	let ctx = RequestContext::new();
	let name = InstanceName::parse("allow").unwrap();

	authorizer.authorize_one(&ctx, &name).await.unwrap();
	authorizer.authorize_one(&ctx, &name).await.unwrap();
	assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

struct StallingBackend {
	calls: AtomicUsize,
	release: Notify,
	response: AuthorizeResponse,
}

#[async_trait]
impl AuthorizeBackend for StallingBackend {
	async fn authorize(&self, _request: AuthorizeRequest) -> Result<AuthorizeResponse, tonic::Status> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.release.notified().await;
		Ok(self.response.clone())
	}
}

#[tokio::test]
async fn concurrent_requests_for_same_key_are_coalesced() {
	let clock = Arc::new(FakeClock::new(1000));
	let backend = Arc::new(StallingBackend {
		calls: AtomicUsize::new(0),
		release: Notify::new(),
		response: allow_response(2000),
	});
	let authorizer = Arc::new(RemoteAuthorizer::new(backend.clone(), Bytes::new(), clock, 100));
	let name = InstanceName::parse("allow").unwrap();

	let a1 = {
		let authorizer = authorizer.clone();
		let name = name.clone();
		tokio::spawn(async move { authorizer.authorize_one(&RequestContext::new(), &name).await })
	};
	let a2 = {
		let authorizer = authorizer.clone();
		let name = name.clone();
		tokio::spawn(async move { authorizer.authorize_one(&RequestContext::new(), &name).await })
	};

	tokio::time::sleep(Duration::from_millis(20)).await;
	assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
	backend.release.notify_waiters();

	assert!(a1.await.unwrap().is_ok());
	assert!(a2.await.unwrap().is_ok());
	assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelling_a_waiter_does_not_affect_the_coordinator() {
	let clock = Arc::new(FakeClock::new(1000));
	let backend = Arc::new(StallingBackend {
		calls: AtomicUsize::new(0),
		release: Notify::new(),
		response: allow_response(2000),
	});
	let authorizer = Arc::new(RemoteAuthorizer::new(backend.clone(), Bytes::new(), clock, 100));
	let name = InstanceName::parse("allow").unwrap();

	let coordinator = {
		let authorizer = authorizer.clone();
		let name = name.clone();
		tokio::spawn(async move { authorizer.authorize_one(&RequestContext::new(), &name).await })
	};
	tokio::time::sleep(Duration::from_millis(20)).await;

	let waiter_ctx = RequestContext::new();
	let waiter = {
		let authorizer = authorizer.clone();
		let name = name.clone();
		let ctx = waiter_ctx.clone();
		tokio::spawn(async move { authorizer.authorize_one(&ctx, &name).await })
	};
	tokio::time::sleep(Duration::from_millis(20)).await;
	waiter_ctx.cancellation().cancel();

	let waiter_result = waiter.await.unwrap();
	assert_eq!(waiter_result.unwrap_err().code(), tonic::Code::Cancelled);

	backend.release.notify_waiters();
	assert!(coordinator.await.unwrap().is_ok());
}

struct FailingThenSucceedingBackend {
	calls: AtomicUsize,
}

#[async_trait]
impl AuthorizeBackend for FailingThenSucceedingBackend {
	async fn authorize(&self, _request: AuthorizeRequest) -> Result<AuthorizeResponse, tonic::Status> {
		let n = self.calls.fetch_add(1, Ordering::SeqCst);
		if n == 0 {
			Err(tonic::Status::data_loss("backend exploded"))
		} else {
			Ok(allow_response(2000))
		}
	}
}

#[tokio::test]
async fn failed_coordinator_does_not_poison_the_cache() {
	let clock = Arc::new(FakeClock::new(1000));
	let backend = Arc::new(FailingThenSucceedingBackend { calls: AtomicUsize::new(0) });
	let authorizer = RemoteAuthorizer::new(backend, Bytes::new(), clock, 100);
	let ctx = RequestContext::new();
	let name = InstanceName::parse("allow").unwrap();

	let first = authorizer.authorize_one(&ctx, &name).await;
	assert!(first.is_err());

	let second = authorizer.authorize_one(&ctx, &name).await;
	assert!(second.is_ok());
}

//! The [`Authenticator`] capability and its remote implementation.

mod remote;

pub use remote::{AuthenticateBackend, GrpcAuthenticateBackend, RemoteRequestHeadersAuthenticator};

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::metadata::AuthenticationMetadata;

/// Validates request credentials, producing [`AuthenticationMetadata`] to
/// be attached to the request context via
/// [`RequestContext::with_metadata`](crate::context::RequestContext::with_metadata).
///
/// A deny is surfaced as `Unauthenticated`, mirroring the wire vocabulary in
/// §6/§7 and reusing `tonic::Status` for exactly the same reason
/// `Authorizer` does.
#[async_trait]
pub trait Authenticator: Send + Sync {
	async fn authenticate(
		&self,
		ctx: &RequestContext,
		headers: &http::HeaderMap,
	) -> Result<AuthenticationMetadata, tonic::Status>;
}

//! The [`Authorizer`] capability and its concrete variants.

mod any;
mod factory;
mod jmespath;
mod remote;
mod r#static;

pub use any::AnyAuthorizer;
pub use factory::{AuthorizerConfig, AuthorizerFactory, ConfigError};
pub use jmespath::JmespathAuthorizer;
pub use r#static::StaticAuthorizer;
pub use remote::{AuthorizeBackend, GrpcAuthorizeBackend, RemoteAuthorizer};

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::instance_name::InstanceName;

/// Decides whether an authenticated caller may operate on a set of
/// [`InstanceName`] scopes.
///
/// Implementations are `Send + Sync` and dispatched through `Arc<dyn
/// Authorizer>`, trait-object dispatch over a one-operation capability
/// rather than an inheritance hierarchy.
#[async_trait]
pub trait Authorizer: Send + Sync {
	/// Returns one result per entry of `names`, in the same order.
	async fn authorize(
		&self,
		ctx: &RequestContext,
		names: &[InstanceName],
	) -> Vec<Result<(), tonic::Status>>;
}

/// The fixed "Permission denied" message used by [`StaticAuthorizer`] and
/// [`JmespathAuthorizer`], allocated once rather than per call.
pub(crate) fn permission_denied() -> tonic::Status {
	tonic::Status::permission_denied("Permission denied")
}

//! Authorization and authentication core for a content-addressable storage /
//! remote-execution front-end: decides, for every inbound request carrying
//! an instance name, whether the authenticated caller may operate on it.
//!
//! TLS/mTLS setup, gRPC server plumbing, metrics registries, and
//! configuration/flag loading are all external collaborators of this crate,
//! not things it provides.

pub mod authenticator;
pub mod authorizer;
pub mod canonical;
pub mod clock;
pub mod context;
pub mod error;
pub mod eviction;
pub mod instance_name;
pub mod metadata;
pub mod timestamp;

pub use authenticator::Authenticator;
pub use authorizer::Authorizer;
pub use context::RequestContext;
pub use error::ConfigError;
pub use instance_name::{InstanceName, InstanceNameError, InstanceNameTrie};
pub use metadata::AuthenticationMetadata;

//! Construction-time errors. These never cross the wire, they're surfaced
//! to whatever assembles the authorizer/authenticator graph at startup, so
//! they're a plain `thiserror` enum rather than `tonic::Status`.

use thiserror::Error;

use crate::instance_name::InstanceNameError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
	#[error("invalid instance name prefix {prefix:?}: {source}")]
	InvalidPrefix { prefix: String, #[source] source: InstanceNameError },

	#[error("invalid jmespath expression: {0}")]
	InvalidExpression(String),

	#[error("header key {offending:?} is not canonical; expected {canonical:?}")]
	NonCanonicalHeaderKey { offending: String, canonical: String },
}

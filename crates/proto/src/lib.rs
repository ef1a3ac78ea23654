//! Generated gRPC client/server code for the remote Authorize/Authenticate
//! RPCs (see `proto/auth.proto`). Regenerated at build time by `build.rs` via
//! `tonic-prost-build` + `protox`.

#![allow(clippy::all)]

pub mod v1 {
	tonic::include_proto!("authguard.v1");
}

pub use v1::auth_service_client::AuthServiceClient;
pub use v1::auth_service_server::{AuthService, AuthServiceServer};
pub use v1::{
	AuthenticateRequest, AuthenticateResponse, AuthenticationMetadataProto, AuthorizeRequest,
	AuthorizeResponse, HeaderValues, TracingAttribute, authenticate_response, authorize_response,
	tracing_attribute,
};

//! Common imports pulled in across the workspace with `use authguard_core::prelude::*;`.

pub use std::sync::Arc;
pub use std::time::Duration;

pub use bytes::Bytes;
pub use tracing::{debug, error, info, trace, warn};

pub use crate::strng::Strng;

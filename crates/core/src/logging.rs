//! Structured logging setup: an `EnvFilter`-driven `fmt` subscriber,
//! installed once by whatever binary embeds this crate.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install a global `tracing` subscriber. `default_filter` is used when
/// `RUST_LOG` is unset (e.g. `"info,authguard=debug"`).
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing(default_filter: &str) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer())
		.try_init();
}

//! Converts the wire `google.protobuf.Timestamp` form used by
//! `cache_expiration_time` into a `SystemTime`, distinguishing "absent"
//! (treated as already expired, but still cacheable for the one call that
//! needed it) from "present but malformed" (rejected outright).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use prost_wkt_types::Timestamp;

/// `Ok` carries the expiration instant. `Err` means the timestamp was
/// present but invalid (out-of-range nanoseconds, or a second count that
/// doesn't fit a `SystemTime`); absence of a timestamp is not an error.
pub fn parse_expiration(ts: Option<&Timestamp>) -> Result<SystemTime, ()> {
	let Some(ts) = ts else {
		return Ok(UNIX_EPOCH);
	};
	if !(0..1_000_000_000).contains(&ts.nanos) {
		return Err(());
	}
	if ts.seconds < 0 {
		return Err(());
	}
	UNIX_EPOCH
		.checked_add(Duration::new(ts.seconds as u64, ts.nanos as u32))
		.ok_or(())
}

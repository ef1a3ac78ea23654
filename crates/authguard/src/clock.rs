//! The wall-clock source used by the remote caches' freshness checks,
//! abstracted so tests can control time deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
	fn now(&self) -> SystemTime;
}

/// The real wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> SystemTime {
		SystemTime::now()
	}
}

/// A clock controlled by tests, expressed in whole seconds since the Unix
/// epoch to match the integer timestamps used in cache-freshness tests.
pub struct FakeClock {
	seconds: AtomicU64,
}

impl FakeClock {
	pub fn new(seconds: u64) -> Self {
		FakeClock { seconds: AtomicU64::new(seconds) }
	}

	pub fn set(&self, seconds: u64) {
		self.seconds.store(seconds, Ordering::SeqCst);
	}
}

impl Clock for FakeClock {
	fn now(&self) -> SystemTime {
		UNIX_EPOCH + Duration::from_secs(self.seconds.load(Ordering::SeqCst))
	}
}

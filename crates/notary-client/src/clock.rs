//! Injectable wall clock.
//!
//! Business logic never calls `SystemTime::now()` directly; every validity
//! check goes through a `Clock`, so tests can pin `now()` instead of racing
//! real time (matching `original_source`'s `time64_t`-based validity window
//! checks, which the notary server itself controls deterministically in
//! tests).

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current unix time, in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs() as i64
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

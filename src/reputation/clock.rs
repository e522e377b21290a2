//! Time source for freshness tracking.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::data_structures::cuckoo::Timestamp;

/// Supplies the current time for lookup hits.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current time in seconds since the unix epoch.
    fn now(&self) -> Timestamp;
}

/// Wall clock. A system clock set before the epoch reads as zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}

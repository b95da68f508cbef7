#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::formats::Flexible;
use serde_with::{DefaultOnError, DurationSeconds, serde_as};
use std::time::Duration;

/// Lowest accepted sampling interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Sampling cadence and lifecycle timings.
///
/// Values that fail to parse (negative numbers, garbage strings) deserialize
/// as zero, and zero is replaced with the documented default by
/// [`Monitor::clamp`].
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Monitor {
    /// Seconds between the start of two sampling cycles.
    #[serde_as(as = "DefaultOnError<DurationSeconds<u64, Flexible>>")]
    pub interval: Duration,

    /// Upper bound on a single probe run.
    #[serde_as(as = "DefaultOnError<DurationSeconds<u64, Flexible>>")]
    pub probe_timeout: Duration,

    /// How long the supervisor waits for tasks to acknowledge cancellation.
    #[serde_as(as = "DefaultOnError<DurationSeconds<u64, Flexible>>")]
    pub shutdown_grace: Duration,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl Monitor {
    pub fn clamp(self) -> Self {
        Self {
            interval: or_default(self.interval, DEFAULT_INTERVAL).max(MIN_INTERVAL),
            probe_timeout: or_default(self.probe_timeout, DEFAULT_PROBE_TIMEOUT)
                .max(Duration::from_secs(1)),
            shutdown_grace: or_default(self.shutdown_grace, DEFAULT_SHUTDOWN_GRACE)
                .max(Duration::from_secs(1)),
        }
    }
}

#[inline]
fn or_default(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_interval_means_default() {
        let monitor = Monitor {
            interval: Duration::ZERO,
            ..Default::default()
        }
        .clamp();
        assert_eq!(monitor.interval, DEFAULT_INTERVAL);
    }

    proptest! {
        #[test]
        fn clamp_enforces_floors(interval in 0u64..10_000, timeout in 0u64..100, grace in 0u64..100) {
            let monitor = Monitor {
                interval: Duration::from_secs(interval),
                probe_timeout: Duration::from_secs(timeout),
                shutdown_grace: Duration::from_secs(grace),
            }
            .clamp();
            prop_assert!(monitor.interval >= MIN_INTERVAL);
            prop_assert!(monitor.probe_timeout >= Duration::from_secs(1));
            prop_assert!(monitor.shutdown_grace >= Duration::from_secs(1));
            if interval >= MIN_INTERVAL.as_secs() {
                prop_assert_eq!(monitor.interval, Duration::from_secs(interval));
            }
        }
    }
}

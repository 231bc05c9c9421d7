//! Reconnect backoff calculation.
//!
//! Sync-only building blocks for the reconnecting client. The timers that
//! act on these values live in `frontwatch-client`; this module only answers
//! "how long to wait before attempt `n`" and "may attempt `n` happen at all".
//!
//! Formula: `base_delay * 2^attempt`, with no jitter and no cap other than
//! the attempt ceiling. With the defaults that is 1s, 2s, 4s, 8s, 16s.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY};

/// Default base delay in milliseconds.
#[allow(clippy::cast_possible_truncation)]
pub const DEFAULT_BASE_DELAY_MS: u64 = RECONNECT_BASE_DELAY.as_millis() as u64;

/// Reconnect parameters: base delay and attempt ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Base delay for exponential backoff in ms (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Reconnect attempts allowed before giving up (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_attempts() -> u32 {
    MAX_RECONNECT_ATTEMPTS
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Policy with an explicit base delay and ceiling.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay_ms: u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX),
            max_attempts,
        }
    }

    /// Delay before the reconnect that follows `attempt` earlier ones.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(backoff_delay_ms(attempt, self.base_delay_ms))
    }

    /// Whether another reconnect may be scheduled after `attempts` so far.
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Base delay as a `Duration`.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// `base_delay_ms * 2^attempt`, saturating at `u64::MAX`.
#[must_use]
pub fn backoff_delay_ms(attempt: u32, base_delay_ms: u64) -> u64 {
    if attempt >= 64 {
        return if base_delay_ms == 0 { 0 } else { u64::MAX };
    }
    base_delay_ms.saturating_mul(1u64 << attempt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_schedule_is_one_to_sixteen_seconds() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (0..5)
            .map(|n| u64::try_from(policy.delay(n).as_millis()).unwrap())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000]);
    }

    #[test]
    fn ceiling_is_exclusive() {
        let policy = ReconnectPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(4));
        assert!(!policy.allows(5));
        assert!(!policy.allows(6));
    }

    #[test]
    fn zero_ceiling_never_allows() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), 0);
        assert!(!policy.allows(0));
    }

    #[test]
    fn huge_attempt_saturates() {
        assert_eq!(backoff_delay_ms(200, 1000), u64::MAX);
        assert_eq!(backoff_delay_ms(63, 1000), u64::MAX);
        assert_eq!(backoff_delay_ms(200, 0), 0);
    }

    #[test]
    fn new_converts_duration() {
        let policy = ReconnectPolicy::new(Duration::from_millis(250), 3);
        assert_eq!(policy.base_delay_ms, 250);
        assert_eq!(policy.base_delay(), Duration::from_millis(250));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let policy: ReconnectPolicy = serde_json::from_str(r#"{"maxAttempts": 2}"#).unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay_ms, 1000);

        let json = serde_json::to_value(ReconnectPolicy::default()).unwrap();
        assert_eq!(json["baseDelayMs"], 1000);
        assert_eq!(json["maxAttempts"], 5);
    }

    proptest! {
        #[test]
        fn delay_doubles_below_ceiling(n in 0u32..5) {
            let policy = ReconnectPolicy::default();
            prop_assert_eq!(policy.delay(n), Duration::from_millis(1000 * (1u64 << n)));
        }

        #[test]
        fn delay_is_monotonic(base in 0u64..10_000, n in 0u32..80) {
            prop_assert!(backoff_delay_ms(n + 1, base) >= backoff_delay_ms(n, base));
        }
    }
}

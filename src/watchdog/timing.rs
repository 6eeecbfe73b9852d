//! Fixed delays of the restart protocol.

use std::time::Duration;

/// Time between polls
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// Fastest poll the loop accepts
pub const MIN_TICK: Duration = Duration::from_millis(100);

/// Pause between killing clients and pressing join
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

/// Client startup allowance before the count is checked again
pub const DEFAULT_VERIFY: Duration = Duration::from_secs(30);

/// How long before a scheduled restart the warning goes out
pub const DEFAULT_WARNING_LEAD: Duration = Duration::from_secs(60);

/// Join attempts per restart
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Upper bound on waiting for the join control to become enabled
pub const DEFAULT_CONTROL_WAIT: Duration = Duration::from_secs(10);

pub use crate::notify::webhook::DEFAULT_TIMEOUT as DEFAULT_NOTIFY_TIMEOUT;

/// Delays used by the watchdog loop and restart sequencer.
///
/// # Example
///
/// ```
/// use rejoin::watchdog::Timings;
/// use std::time::Duration;
///
/// let timings = Timings::default().with_verify(Duration::from_secs(45));
/// assert_eq!(timings.tick, Duration::from_secs(5));
/// assert_eq!(timings.verify, Duration::from_secs(45));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub tick: Duration,
    pub settle: Duration,
    pub verify: Duration,
    pub warning_lead: Duration,
    pub max_attempts: u32,
    pub control_wait: Duration,
    /// Per-request timeout for webhook delivery
    pub notify_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            settle: DEFAULT_SETTLE,
            verify: DEFAULT_VERIFY,
            warning_lead: DEFAULT_WARNING_LEAD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            control_wait: DEFAULT_CONTROL_WAIT,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }
}

impl Timings {
    /// Poll every `tick`, never faster than [`MIN_TICK`].
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(MIN_TICK);
        self
    }

    #[must_use]
    pub fn with_verify(mut self, verify: Duration) -> Self {
        self.verify = verify;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Longest a single restart can take: every attempt settles and verifies.
    pub fn worst_case_restart(&self) -> Duration {
        (self.settle + self.verify) * self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Timings::default();
        assert_eq!(t.tick, Duration::from_secs(5));
        assert_eq!(t.settle, Duration::from_secs(1));
        assert_eq!(t.verify, Duration::from_secs(30));
        assert_eq!(t.warning_lead, Duration::from_secs(60));
        assert_eq!(t.max_attempts, 3);
        assert_eq!(t.notify_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_max_attempts_at_least_one() {
        assert_eq!(Timings::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_tick_is_clamped() {
        assert_eq!(Timings::default().with_tick(Duration::ZERO).tick, MIN_TICK);
        assert_eq!(
            Timings::default().with_tick(Duration::from_secs(2)).tick,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_worst_case_restart() {
        assert_eq!(
            Timings::default().worst_case_restart(),
            Duration::from_secs(93)
        );
    }
}

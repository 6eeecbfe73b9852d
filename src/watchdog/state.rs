//! Watchdog state types.
//!
//! [`CycleState`] is private to the loop. [`RunStatus`] and
//! [`WatchdogSnapshot`] are what the outside world gets to see.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Externally observable state of a watchdog run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Not started
    Idle,
    /// Monitoring
    Running,
    /// Stop requested, waiting for the next safe point
    Stopping,
    /// Stopped on request
    Stopped,
    /// Every restart attempt failed; monitoring halted
    Failed,
    /// The monitoring task died unexpectedly
    Error,
}

impl RunStatus {
    /// True once the run is over and will not change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed | Self::Error)
    }

    /// Process exit code for a finished run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Failed => 3,
            Self::Error => 4,
            _ => 0,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Why a restart was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartTrigger {
    Crash,
    Scheduled,
}

impl std::fmt::Display for RestartTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crash => write!(f, "crash"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// How a restart sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartResult {
    Succeeded,
    Failed,
    /// Stop was requested between attempts
    Cancelled,
}

/// Result of one [`RestartSequencer`](super::RestartSequencer) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartOutcome {
    pub result: RestartResult,
    /// Join attempts made
    pub attempts: u32,
}

impl RestartOutcome {
    pub fn succeeded(attempts: u32) -> Self {
        Self {
            result: RestartResult::Succeeded,
            attempts,
        }
    }

    pub fn failed(attempts: u32) -> Self {
        Self {
            result: RestartResult::Failed,
            attempts,
        }
    }

    pub fn cancelled(attempts: u32) -> Self {
        Self {
            result: RestartResult::Cancelled,
            attempts,
        }
    }
}

/// Per-cycle bookkeeping of the watchdog loop.
#[derive(Debug, Clone)]
pub struct CycleState {
    started: Instant,
    warning_sent: bool,
    last_count: usize,
}

impl CycleState {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            warning_sent: false,
            last_count: 0,
        }
    }

    /// Start a new cycle.
    ///
    /// The last count goes back to zero so clients still coming up after a
    /// restart are not mistaken for a crash.
    pub fn reset(&mut self, now: Instant) {
        if now > self.started {
            self.started = now;
        }
        self.warning_sent = false;
        self.last_count = 0;
    }

    /// Record a new count and return the previous one.
    pub fn observe(&mut self, count: usize) -> usize {
        std::mem::replace(&mut self.last_count, count)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn warning_sent(&self) -> bool {
        self.warning_sent
    }

    pub fn mark_warning_sent(&mut self) {
        self.warning_sent = true;
    }

    /// The warning is due once elapsed reaches `interval - lead`.
    ///
    /// When the lead is at least the interval the threshold is zero and the
    /// warning goes out on the first tick of the cycle.
    pub fn warning_due(&self, elapsed: Duration, interval: Duration, lead: Duration) -> bool {
        !self.warning_sent && elapsed >= interval.saturating_sub(lead)
    }
}

/// `previous > floor && current == floor`: the group collapsed to the floor.
pub fn is_crash(previous: usize, current: usize, floor: usize) -> bool {
    previous > floor && current == floor
}

/// Elapsed share of the interval, 0-100.
pub fn progress_percent(elapsed: Duration, interval: Duration) -> u8 {
    if interval.is_zero() {
        return 100;
    }
    let pct = elapsed.as_secs_f64() / interval.as_secs_f64() * 100.0;
    pct.clamp(0.0, 100.0) as u8
}

/// What the foreground sees of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogSnapshot {
    pub status: RunStatus,
    /// Cycle progress, display only
    pub progress_percent: u8,
    /// Successful restarts this run
    pub restarts: u32,
    /// Attempts used by the most recent restart
    pub last_attempts: Option<u32>,
    pub last_restart_at: Option<DateTime<Local>>,
}

impl Default for WatchdogSnapshot {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            progress_percent: 0,
            restarts: 0,
            last_attempts: None,
            last_restart_at: None,
        }
    }
}

//! The validated, immutable configuration of one watchdog run.

use super::Settings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point on the virtual screen, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl std::fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Configuration the watchdog runs with.
///
/// Built from [`Settings`] only after validation passed, then shared
/// read-only for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartConfig {
    /// Time between scheduled restarts
    pub interval: Duration,
    /// Webhook URLs that receive notifications
    pub endpoints: Vec<String>,
    /// Recipient mentioned when every restart attempt failed
    pub escalation_id: Option<String>,
    /// Prune helper processes down to the oldest one after a restart
    pub limit_helpers: bool,
    /// Fallback click position for the join button
    pub click_point: Option<ScreenPoint>,
    pub target_process: String,
    pub helper_process: String,
    pub manager_window: String,
    pub join_control: String,
    /// Count that, reached from a higher count, is treated as a crash
    pub crash_floor: usize,
}

impl RestartConfig {
    pub(crate) fn from_validated(settings: &Settings) -> Self {
        let escalation = settings.escalation_id.trim();
        Self {
            interval: Duration::from_secs(u64::from(settings.interval_minutes) * 60),
            endpoints: settings.active_webhooks().map(str::to_string).collect(),
            escalation_id: (!escalation.is_empty()).then(|| escalation.to_string()),
            limit_helpers: settings.limit_helpers,
            click_point: settings.click_point(),
            target_process: settings.target_process.trim().to_string(),
            helper_process: settings.helper_process.trim().to_string(),
            manager_window: settings.manager_window.clone(),
            join_control: settings.join_control.clone(),
            crash_floor: settings.crash_floor,
        }
    }

    /// Interval in whole minutes, for messages.
    pub fn interval_minutes(&self) -> u64 {
        self.interval.as_secs() / 60
    }
}

//! Ready-made values for tests.

use crate::config::{
    RestartConfig, DEFAULT_CRASH_FLOOR, DEFAULT_HELPER_PROCESS, DEFAULT_JOIN_CONTROL,
    DEFAULT_MANAGER_WINDOW, DEFAULT_TARGET_PROCESS,
};
use std::time::Duration;

/// A webhook URL that passes validation.
pub const WEBHOOK_URL: &str = "https://discord.com/api/webhooks/123456789/test-token";

/// A valid config with one endpoint, no escalation, no click point and
/// helper capping off.
#[must_use]
pub fn restart_config(interval: Duration) -> RestartConfig {
    RestartConfig {
        interval,
        endpoints: vec![WEBHOOK_URL.to_string()],
        escalation_id: None,
        limit_helpers: false,
        click_point: None,
        target_process: DEFAULT_TARGET_PROCESS.to_string(),
        helper_process: DEFAULT_HELPER_PROCESS.to_string(),
        manager_window: DEFAULT_MANAGER_WINDOW.to_string(),
        join_control: DEFAULT_JOIN_CONTROL.to_string(),
        crash_floor: DEFAULT_CRASH_FLOOR,
    }
}

//! Message text for every notification the watchdog sends.

use chrono::{DateTime, TimeZone};
use std::time::Duration;

/// Sent when monitoring starts.
pub fn started(interval_minutes: u64) -> String {
    format!("🟢 Watchdog started. Clients restart every {interval_minutes} minute(s).")
}

/// Sent when monitoring stops on request.
pub fn stopped() -> String {
    "⏹️ Watchdog stopped.".to_string()
}

/// Sent once per cycle, ahead of the scheduled restart.
pub fn warning<Tz: TimeZone>(restart_at: &DateTime<Tz>, remaining: Duration) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "⚠️ Clients restart at {} (in {}).",
        restart_at.format("%H:%M:%S"),
        human_duration(remaining)
    )
}

/// Reason given for a restart triggered by the schedule.
pub fn scheduled(interval_minutes: u64) -> String {
    format!("🔄 Scheduled restart ({interval_minutes} minute cycle). Restarting clients...")
}

/// Reason given for a restart triggered by a crash.
pub fn crash(previous: usize, current: usize) -> String {
    format!("💥 Client crash detected ({previous} → {current} running). Restarting clients...")
}

/// Sent when an attempt left no client running and another attempt follows.
pub fn retry(attempt: u32, max_attempts: u32) -> String {
    format!(
        "⚠️ Restart attempt {attempt}/{max_attempts} failed: no client came up. Retrying..."
    )
}

/// Sent when every attempt failed; monitoring halts afterwards.
pub fn failure(max_attempts: u32, escalation_id: Option<&str>) -> String {
    let mut text = format!(
        "❌ Restart failed after {max_attempts} attempts. Monitoring halted; manual action required."
    );
    if let Some(id) = escalation_id {
        text.push_str(&format!(" <@{id}>"));
    }
    text
}

/// Sent by the `notify-test` command.
pub fn test() -> String {
    "🔔 Test notification from rejoin.".to_string()
}

/// Render a duration as `1m 05s` / `45s`.
pub fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 60, secs % 60) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s:02}s"),
    }
}

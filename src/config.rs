//! Settings persistence for the rejoin watchdog.
//!
//! The settings file is a flat JSON document. It is the raw, possibly
//! invalid record the user edits; [`validation`] turns it into the
//! immutable [`RestartConfig`] the watchdog consumes.
//!
//! # Example settings.json
//!
//! ```json
//! {
//!   "intervalMinutes": 28,
//!   "webhookUrls": ["https://discord.com/api/webhooks/123/abc"],
//!   "escalationId": "123456789012345678",
//!   "limitHelpers": true,
//!   "clickX": 640,
//!   "clickY": 480
//! }
//! ```

pub mod restart;
pub mod validation;

pub use restart::{RestartConfig, ScreenPoint};
pub use validation::{FieldError, ValidationReport};

use crate::error::{IntoRejoinError, RejoinError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Restart interval used when no settings file exists
pub const DEFAULT_INTERVAL_MINUTES: u32 = 28;

/// Smallest accepted restart interval
pub const MIN_INTERVAL_MINUTES: u32 = 1;

/// Largest accepted restart interval
pub const MAX_INTERVAL_MINUTES: u32 = 999;

/// Number of webhook slots in the settings record
pub const MAX_WEBHOOKS: usize = 2;

/// Default client process name
pub const DEFAULT_TARGET_PROCESS: &str = "RobloxPlayerBeta.exe";

/// Default helper process name
pub const DEFAULT_HELPER_PROCESS: &str = "RobloxCrashHandler.exe";

/// Default title of the account manager window
pub const DEFAULT_MANAGER_WINDOW: &str = "Roblox Account Manager";

/// Default name of the join control inside the manager window
pub const DEFAULT_JOIN_CONTROL: &str = "Join Server";

/// Client count that counts as "the group collapsed" when reached from above
pub const DEFAULT_CRASH_FLOOR: usize = 1;

/// Persisted watchdog settings.
///
/// Missing fields take their defaults, unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Minutes between scheduled restarts (1-999)
    pub interval_minutes: u32,
    /// Webhook slots; empty strings are unused slots
    pub webhook_urls: Vec<String>,
    /// Recipient mentioned in the final failure message
    pub escalation_id: String,
    /// Keep only the oldest helper process after a restart
    pub limit_helpers: bool,
    /// Saved screen X coordinate of the join button
    pub click_x: Option<i32>,
    /// Saved screen Y coordinate of the join button
    pub click_y: Option<i32>,
    /// Process name of the managed client
    pub target_process: String,
    /// Process name of the helper spawned alongside each client
    pub helper_process: String,
    /// Title of the account manager window
    pub manager_window: String,
    /// Name of the join control in the manager window
    pub join_control: String,
    /// Client count treated as a crash when reached from a higher count
    pub crash_floor: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            webhook_urls: Vec::new(),
            escalation_id: String::new(),
            limit_helpers: false,
            click_x: None,
            click_y: None,
            target_process: DEFAULT_TARGET_PROCESS.to_string(),
            helper_process: DEFAULT_HELPER_PROCESS.to_string(),
            manager_window: DEFAULT_MANAGER_WINDOW.to_string(),
            join_control: DEFAULT_JOIN_CONTROL.to_string(),
            crash_floor: DEFAULT_CRASH_FLOOR,
        }
    }
}

impl Settings {
    /// Load settings from a file.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or parsed is an error; see [`Settings::load_or_default`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RejoinError::config_with_path(e.to_string(), path.to_path_buf()))?;
        serde_json::from_str(&content)
            .map_err(|e| RejoinError::config_with_path(e.to_string(), path.to_path_buf()))
    }

    /// Load settings, falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(
                "Could not read settings from {}: {}. Using defaults.",
                path.display(),
                e
            );
            Self::default()
        })
    }

    /// Write settings to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).into_rejoin_config()?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Default settings file location (`<config dir>/rejoin/settings.json`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("rejoin"))
            .unwrap_or_else(|| PathBuf::from(".rejoin"))
            .join("settings.json")
    }

    /// The saved click position, when both coordinates are present.
    pub fn click_point(&self) -> Option<ScreenPoint> {
        match (self.click_x, self.click_y) {
            (Some(x), Some(y)) => Some(ScreenPoint { x, y }),
            _ => None,
        }
    }

    /// Webhook slots that are actually filled in.
    pub fn active_webhooks(&self) -> impl Iterator<Item = &str> {
        self.webhook_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
    }

    /// Validate and convert into the immutable watchdog configuration.
    pub fn to_restart_config(&self) -> std::result::Result<RestartConfig, ValidationReport> {
        let report = self.validate();
        if report.is_valid() {
            Ok(RestartConfig::from_validated(self))
        } else {
            Err(report)
        }
    }
}

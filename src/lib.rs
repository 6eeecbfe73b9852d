//! Rejoin - game client restart watchdog
//!
//! Keeps a group of game clients alive: polls the client count, restarts
//! the clients on a fixed interval or when a crash is detected, presses the
//! account manager's join button to bring them back, and reports every step
//! to webhooks.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`] - Settings persistence, validation and the immutable run config
//! - [`error`] - Custom error types and handling
//! - [`join`] - Join button strategies (UI automation, pointer click)
//! - [`notify`] - Webhook notifications and message text
//! - [`process`] - Counting and killing client and helper processes
//! - [`watchdog`] - The monitoring loop and restart sequencer
//! - [`testing`] - Test doubles for the above
//!
//! # Example
//!
//! ```rust,ignore
//! use rejoin::config::Settings;
//! use rejoin::watchdog::{Timings, Watchdog};
//!
//! let settings = Settings::load_or_default(&Settings::default_path());
//! let config = settings.to_restart_config().map_err(|r| anyhow::anyhow!(r.summary()))?;
//!
//! let mut handle = Watchdog::system(config, Timings::default())?.spawn();
//! let status = handle.wait().await;
//! ```

pub mod config;
pub mod error;
pub mod join;
pub mod notify;
pub mod process;
pub mod testing;
pub mod watchdog;

// Re-export commonly used types
pub use error::{IntoRejoinError, RejoinError, Result};

pub use config::{RestartConfig, ScreenPoint, Settings, ValidationReport};

pub use join::{ButtonInvoker, JoinStrategy};

pub use notify::{DeliveryReport, Notifier, WebhookNotifier};

pub use process::{ProcessCounter, ProcessTable, ProcessTerminator, SystemProcessTable};

pub use watchdog::{
    RestartOutcome, RestartSequencer, RunStatus, StopSignal, Timings, Watchdog, WatchdogHandle,
    WatchdogSnapshot,
};

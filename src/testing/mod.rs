//! Test doubles for the watchdog's external collaborators.
//!
//! The loop and sequencer only see [`ProcessTable`], [`JoinStrategy`] and
//! [`Notifier`] trait objects, so every timing and retry path can be
//! exercised under paused tokio time without touching real processes,
//! windows or webhooks.
//!
//! # Example
//!
//! ```rust,ignore
//! use rejoin::testing::{MockJoinStrategy, MockNotifier, MockProcessTable};
//!
//! let table = MockProcessTable::new("client.exe", "helper.exe")
//!     .with_counts(vec![2, 2, 1])
//!     .with_helpers(vec![(500, 1), (501, 2)]);
//! let join = MockJoinStrategy::failing("ui-automation");
//! let notifier = MockNotifier::new();
//! ```
//!
//! [`ProcessTable`]: crate::process::ProcessTable
//! [`JoinStrategy`]: crate::join::JoinStrategy
//! [`Notifier`]: crate::notify::Notifier

pub mod fixtures;
pub mod mocks;

pub use mocks::*;

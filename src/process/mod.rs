//! Client and helper process control.
//!
//! The watchdog never talks to the OS directly. It goes through a
//! [`ProcessTable`], which lists processes by name and kills them by pid.
//! [`ProcessCounter`] and [`ProcessTerminator`] hold the policy on top:
//! what to count, what to kill, and which helper survives capping.
//!
//! # Example
//!
//! ```rust,ignore
//! use rejoin::process::{ProcessCounter, ProcessTerminator, SystemProcessTable};
//! use std::sync::Arc;
//!
//! let table = Arc::new(SystemProcessTable::new());
//! let counter = ProcessCounter::new(table.clone(), "RobloxPlayerBeta.exe");
//! println!("{} clients running", counter.count().await);
//! ```

pub mod system;

pub use system::SystemProcessTable;

use crate::error::{RejoinError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A running process as seen by the watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    /// Creation time, seconds since the Unix epoch
    pub started_at: u64,
}

/// Abstraction over the OS process list.
///
/// Enables testing the restart logic without real processes. Implementations
/// that touch the OS must not block the async runtime.
#[async_trait]
pub trait ProcessTable: Send + Sync {
    /// List processes whose name matches `name`.
    ///
    /// Matching ignores case and a trailing `.exe`.
    async fn list(&self, name: &str) -> Vec<ProcessEntry>;

    /// Count processes whose name matches `name`.
    async fn count(&self, name: &str) -> usize {
        self.list(name).await.len()
    }

    /// Kill a process by pid.
    ///
    /// # Errors
    ///
    /// Returns an error if the process exists but could not be killed.
    async fn kill(&self, pid: u32) -> Result<()>;
}

/// Normalize a process name for comparison.
pub fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Pick the helpers that capping removes.
///
/// Helpers are ordered by creation time (pid breaks ties); the earliest one
/// is kept and every later one is returned.
pub fn surplus_helpers(mut helpers: Vec<ProcessEntry>) -> Vec<ProcessEntry> {
    if helpers.len() <= 1 {
        return Vec::new();
    }
    helpers.sort_by_key(|p| (p.started_at, p.pid));
    helpers.split_off(1)
}

/// Outcome of a kill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    /// Pids that were killed
    pub killed: Vec<u32>,
    /// Pids that survived, with the reason
    pub failed: Vec<(u32, String)>,
}

impl TerminationReport {
    /// True when every targeted process was killed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    async fn kill_all(&mut self, table: &dyn ProcessTable, entries: Vec<ProcessEntry>) {
        for entry in entries {
            match table.kill(entry.pid).await {
                Ok(()) => {
                    debug!("Killed {} (pid {})", entry.name, entry.pid);
                    self.killed.push(entry.pid);
                }
                Err(e) => {
                    warn!("Could not kill {} (pid {}): {}", entry.name, entry.pid, e);
                    self.failed.push((entry.pid, e.to_string()));
                }
            }
        }
    }
}

/// Counts running client processes.
#[derive(Clone)]
pub struct ProcessCounter {
    table: Arc<dyn ProcessTable>,
    target: String,
}

impl ProcessCounter {
    pub fn new(table: Arc<dyn ProcessTable>, target: impl Into<String>) -> Self {
        Self {
            table,
            target: target.into(),
        }
    }

    /// Number of client processes currently running.
    pub async fn count(&self) -> usize {
        self.table.count(&self.target).await
    }
}

/// Kills clients and helpers, and caps helpers to one survivor.
#[derive(Clone)]
pub struct ProcessTerminator {
    table: Arc<dyn ProcessTable>,
    target: String,
    helper: String,
}

impl ProcessTerminator {
    pub fn new(
        table: Arc<dyn ProcessTable>,
        target: impl Into<String>,
        helper: impl Into<String>,
    ) -> Self {
        Self {
            table,
            target: target.into(),
            helper: helper.into(),
        }
    }

    /// Kill every client and helper process. Failures are logged, not raised.
    pub async fn terminate_all(&self) -> TerminationReport {
        let mut report = TerminationReport::default();
        let clients = self.table.list(&self.target).await;
        let helpers = self.table.list(&self.helper).await;
        report.kill_all(self.table.as_ref(), clients).await;
        report.kill_all(self.table.as_ref(), helpers).await;

        info!(
            "Terminated {} process(es), {} failure(s)",
            report.killed.len(),
            report.failed.len()
        );
        report
    }

    /// Kill every helper except the earliest-created one.
    pub async fn cap_helpers(&self) -> TerminationReport {
        let mut report = TerminationReport::default();
        let surplus = surplus_helpers(self.table.list(&self.helper).await);
        if surplus.is_empty() {
            debug!("Helper cap: nothing to prune");
            return report;
        }

        report.kill_all(self.table.as_ref(), surplus).await;
        info!("Helper cap: pruned {} newer helper(s)", report.killed.len());
        report
    }
}

/// Build the error a [`ProcessTable`] reports for a kill that did not take.
pub(crate) fn kill_refused(pid: u32) -> RejoinError {
    RejoinError::Process {
        pid,
        message: "the OS refused the kill signal".to_string(),
    }
}

//! Mock implementations of the watchdog's collaborator traits.
//!
//! These mocks provide controllable test doubles for the OS process list,
//! the join button and the webhooks, enabling deterministic unit tests.

use crate::error::{RejoinError, Result};
use crate::join::JoinStrategy;
use crate::notify::{DeliveryReport, Notifier};
use crate::process::{kill_refused, normalize_name, ProcessEntry, ProcessTable};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// First pid handed out to synthetic client processes
const CLIENT_PID_BASE: u32 = 1000;

#[derive(Debug, Default)]
struct TableState {
    counts: Vec<usize>,
    cursor: usize,
    helpers: Vec<ProcessEntry>,
    respawn: Vec<ProcessEntry>,
    unkillable: HashSet<u32>,
    killed: Vec<u32>,
}

impl TableState {
    fn current(&self) -> usize {
        self.counts.get(self.cursor).copied().unwrap_or(0)
    }
}

/// Scripted process table.
///
/// Each call to [`count`](ProcessTable::count) for the client name returns
/// the next value of the script; the last value repeats. Listing clients
/// reports as many synthetic processes as the next count would, without
/// advancing the script. Helpers are real entries that kills remove.
///
/// # Example
///
/// ```rust,ignore
/// let table = MockProcessTable::new("client.exe", "helper.exe")
///     .with_counts(vec![2, 2, 1]);
///
/// assert_eq!(table.count("client.exe").await, 2);
/// ```
#[derive(Debug)]
pub struct MockProcessTable {
    target: String,
    helper: String,
    state: Mutex<TableState>,
}

impl MockProcessTable {
    /// Create a table with no clients and no helpers.
    #[must_use]
    pub fn new(target: &str, helper: &str) -> Self {
        Self {
            target: normalize_name(target),
            helper: normalize_name(helper),
            state: Mutex::new(TableState::default()),
        }
    }

    /// Set the sequence of client counts.
    #[must_use]
    pub fn with_counts(self, counts: Vec<usize>) -> Self {
        self.with_state(|s| s.counts = counts)
    }

    /// Add helpers as `(pid, started_at)` pairs.
    #[must_use]
    pub fn with_helpers(self, helpers: Vec<(u32, u64)>) -> Self {
        let entries = self.helper_entries(helpers);
        self.with_state(|s| s.helpers.extend(entries))
    }

    /// Make killing `pid` fail.
    #[must_use]
    pub fn with_unkillable(self, pid: u32) -> Self {
        self.with_state(|s| {
            s.unkillable.insert(pid);
        })
    }

    /// Helpers that appear the first time a client count above zero is
    /// read while no helper is running, as a relaunched client would spawn.
    pub fn respawn_helpers(&self, helpers: Vec<(u32, u64)>) {
        let entries = self.helper_entries(helpers);
        self.lock().respawn = entries;
    }

    /// Pids killed so far, in kill order.
    pub fn killed(&self) -> Vec<u32> {
        self.lock().killed.clone()
    }

    /// Pids of the helpers still running, ascending.
    pub fn helper_pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.lock().helpers.iter().map(|p| p.pid).collect();
        pids.sort_unstable();
        pids
    }

    fn with_state(self, f: impl FnOnce(&mut TableState)) -> Self {
        f(&mut *self.lock());
        self
    }

    fn helper_entries(&self, helpers: Vec<(u32, u64)>) -> Vec<ProcessEntry> {
        helpers
            .into_iter()
            .map(|(pid, started_at)| ProcessEntry {
                pid,
                name: self.helper.clone(),
                started_at,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProcessTable for MockProcessTable {
    async fn list(&self, name: &str) -> Vec<ProcessEntry> {
        let wanted = normalize_name(name);
        let state = self.lock();
        if wanted == self.target {
            (0..state.current())
                .map(|i| ProcessEntry {
                    pid: CLIENT_PID_BASE + i as u32,
                    name: self.target.clone(),
                    started_at: 0,
                })
                .collect()
        } else if wanted == self.helper {
            state.helpers.clone()
        } else {
            Vec::new()
        }
    }

    async fn count(&self, name: &str) -> usize {
        let wanted = normalize_name(name);
        let mut state = self.lock();
        if wanted == self.helper {
            return state.helpers.len();
        }
        if wanted != self.target {
            return 0;
        }

        let value = state.current();
        if state.cursor + 1 < state.counts.len() {
            state.cursor += 1;
        }
        if value > 0 && state.helpers.is_empty() && !state.respawn.is_empty() {
            state.helpers = std::mem::take(&mut state.respawn);
        }
        value
    }

    async fn kill(&self, pid: u32) -> Result<()> {
        let mut state = self.lock();
        if state.unkillable.contains(&pid) {
            return Err(kill_refused(pid));
        }
        state.helpers.retain(|p| p.pid != pid);
        state.killed.push(pid);
        Ok(())
    }
}

/// Join strategy with a fixed result that counts its calls.
#[derive(Debug)]
pub struct MockJoinStrategy {
    name: String,
    succeeds: bool,
    calls: AtomicU32,
}

impl MockJoinStrategy {
    #[must_use]
    pub fn succeeding(name: &str) -> Self {
        Self {
            name: name.to_string(),
            succeeds: true,
            calls: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn failing(name: &str) -> Self {
        Self {
            succeeds: false,
            ..Self::succeeding(name)
        }
    }

    /// Number of times `attempt` was called.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JoinStrategy for MockJoinStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeeds {
            Ok(())
        } else {
            Err(RejoinError::tool(&self.name, "scripted failure"))
        }
    }
}

/// Notifier that records every message instead of sending it.
#[derive(Debug, Default)]
pub struct MockNotifier {
    messages: Mutex<Vec<String>>,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, text: &str) -> DeliveryReport {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        DeliveryReport {
            delivered: 1,
            failed: Vec::new(),
        }
    }
}

//! [`ProcessTable`] backed by the live OS process list.

use super::{kill_refused, normalize_name, ProcessEntry, ProcessTable};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Reads and kills real processes through `sysinfo`.
///
/// The process list is refreshed on every call, so counts are never stale
/// by more than the call itself. Refreshes and kills run on the blocking
/// thread pool.
#[derive(Clone)]
pub struct SystemProcessTable {
    system: Arc<Mutex<System>>,
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
        }
    }

    // A panic mid-refresh leaves the snapshot usable; the next call refreshes it.
    fn lock(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn list_blocking(&self, wanted: &str) -> Vec<ProcessEntry> {
        let mut system = self.lock();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::new());

        system
            .processes()
            .iter()
            .filter_map(|(pid, process)| {
                let proc_name = process.name().to_string_lossy().to_string();
                (normalize_name(&proc_name) == wanted).then(|| ProcessEntry {
                    pid: pid.as_u32(),
                    name: proc_name,
                    started_at: process.start_time(),
                })
            })
            .collect()
    }

    fn kill_blocking(&self, pid: u32) -> Result<()> {
        let system = self.lock();
        match system.process(Pid::from_u32(pid)) {
            Some(process) if process.kill() => Ok(()),
            Some(_) => Err(kill_refused(pid)),
            None => {
                debug!("pid {} already gone", pid);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ProcessTable for SystemProcessTable {
    async fn list(&self, name: &str) -> Vec<ProcessEntry> {
        let table = self.clone();
        let wanted = normalize_name(name);
        match tokio::task::spawn_blocking(move || table.list_blocking(&wanted)).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Process scan for {} did not complete: {}", name, e);
                Vec::new()
            }
        }
    }

    async fn kill(&self, pid: u32) -> Result<()> {
        let table = self.clone();
        match tokio::task::spawn_blocking(move || table.kill_blocking(pid)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Kill of pid {} did not complete: {}", pid, e);
                Err(kill_refused(pid))
            }
        }
    }
}

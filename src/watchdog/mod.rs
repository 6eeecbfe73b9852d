//! The watchdog loop.
//!
//! A [`Watchdog`] polls the client count every tick, restarts the clients
//! when a crash is detected or the interval runs out, and warns ahead of
//! each scheduled restart.
//!
//! ```text
//!   tick ──► stop? ──yes──► Stopped
//!             │ no
//!             ▼
//!           count C ──► crash (prev > floor, C == floor)? ──► restart, next tick
//!             │
//!             ▼
//!           elapsed ≥ interval - lead ──► warning (once per cycle)
//!             │
//!             ▼
//!           elapsed ≥ interval ──► restart
//! ```
//!
//! Restarts run inline; the loop never starts a second one while one is in
//! flight. A failed restart halts the loop with [`RunStatus::Failed`].
//!
//! # Example
//!
//! ```rust,ignore
//! use rejoin::watchdog::{Timings, Watchdog};
//!
//! let watchdog = Watchdog::system(config, Timings::default())?;
//! let mut handle = watchdog.spawn();
//! // ... later
//! handle.stop();
//! let status = handle.wait().await;
//! ```

pub mod sequencer;
pub mod state;
pub mod stop;
pub mod timing;

pub use sequencer::RestartSequencer;
pub use state::{
    is_crash, progress_percent, CycleState, RestartOutcome, RestartResult, RestartTrigger,
    RunStatus, WatchdogSnapshot,
};
pub use stop::StopSignal;
pub use timing::Timings;

use crate::config::RestartConfig;
use crate::error::Result;
use crate::join::ButtonInvoker;
use crate::notify::{messages, Notifier, WebhookNotifier};
use crate::process::{ProcessTable, SystemProcessTable};
use chrono::Local;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Monitors one group of clients until stopped or a restart fails.
pub struct Watchdog {
    run_id: Uuid,
    config: RestartConfig,
    timings: Timings,
    sequencer: RestartSequencer,
    status: Arc<watch::Sender<WatchdogSnapshot>>,
}

impl Watchdog {
    pub fn new(
        config: RestartConfig,
        timings: Timings,
        table: Arc<dyn ProcessTable>,
        invoker: ButtonInvoker,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let sequencer = RestartSequencer::new(&config, timings, table, invoker, notifier);
        let (status, _) = watch::channel(WatchdogSnapshot::default());
        Self {
            run_id: Uuid::new_v4(),
            config,
            timings,
            sequencer,
            status: Arc::new(status),
        }
    }

    /// Watchdog wired to the real process table, join tools and webhooks.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn system(config: RestartConfig, timings: Timings) -> Result<Self> {
        let notifier = WebhookNotifier::new(config.endpoints.clone(), timings.notify_timeout)?;
        let invoker = ButtonInvoker::for_config(&config, timings.control_wait);
        Ok(Self::new(
            config,
            timings,
            Arc::new(SystemProcessTable::new()),
            invoker,
            Arc::new(notifier),
        ))
    }

    /// Identifies this run in logs.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Receive every snapshot the loop publishes.
    pub fn subscribe(&self) -> watch::Receiver<WatchdogSnapshot> {
        self.status.subscribe()
    }

    /// Run on a background task.
    pub fn spawn(self) -> WatchdogHandle {
        let stop = StopSignal::new();
        let status = Arc::clone(&self.status);
        let task_stop = stop.clone();
        let task = tokio::spawn(async move { self.run(&task_stop).await });
        WatchdogHandle {
            stop,
            status,
            task: Some(task),
        }
    }

    /// Monitor until `stop` is requested or a restart fails.
    pub async fn run(&self, stop: &StopSignal) -> RunStatus {
        let interval = self.config.interval;
        let lead = self.timings.warning_lead;

        info!(
            run_id = %self.run_id,
            "Watchdog running: interval {}m, tick {:?}, {} endpoint(s)",
            self.config.interval_minutes(),
            self.timings.tick,
            self.config.endpoints.len()
        );
        self.set_status(RunStatus::Running);
        self.notify(&messages::started(self.config.interval_minutes()))
            .await;

        let mut cycle = CycleState::new(Instant::now());
        let mut ticker = tokio::time::interval(self.timings.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if stop.is_requested() {
                return self.finish_stopped().await;
            }

            let count = self.sequencer.count().await;
            let previous = cycle.observe(count);
            if is_crash(previous, count, self.config.crash_floor) {
                warn!("Client count dropped {} -> {}", previous, count);
                let reason = messages::crash(previous, count);
                match self
                    .restart(RestartTrigger::Crash, &reason, &mut cycle, stop)
                    .await
                {
                    Some(status) => return status,
                    None => continue,
                }
            }

            let elapsed = cycle.elapsed(Instant::now());
            self.publish_progress(progress_percent(elapsed, interval));

            if cycle.warning_due(elapsed, interval, lead) {
                let remaining = interval.saturating_sub(elapsed);
                let restart_at = Local::now()
                    + chrono::Duration::from_std(remaining)
                        .unwrap_or_else(|_| chrono::Duration::zero());
                info!("Restart due in {:?}", remaining);
                self.notify(&messages::warning(&restart_at, remaining))
                    .await;
                cycle.mark_warning_sent();
            }

            if elapsed >= interval {
                let reason = messages::scheduled(self.config.interval_minutes());
                if let Some(status) = self
                    .restart(RestartTrigger::Scheduled, &reason, &mut cycle, stop)
                    .await
                {
                    return status;
                }
            }
        }
    }

    /// Run one restart. Returns the terminal status if the loop must end.
    async fn restart(
        &self,
        trigger: RestartTrigger,
        reason: &str,
        cycle: &mut CycleState,
        stop: &StopSignal,
    ) -> Option<RunStatus> {
        info!("Starting {} restart", trigger);
        let outcome = self.sequencer.perform(reason, stop).await;

        match outcome.result {
            RestartResult::Succeeded => {
                cycle.reset(Instant::now());
                self.status.send_modify(|snapshot| {
                    snapshot.restarts += 1;
                    snapshot.last_attempts = Some(outcome.attempts);
                    snapshot.last_restart_at = Some(Local::now());
                    snapshot.progress_percent = 0;
                });
                None
            }
            RestartResult::Cancelled => Some(self.finish_stopped().await),
            RestartResult::Failed => {
                error!(
                    "{} restart failed after {} attempt(s); monitoring halted",
                    trigger, outcome.attempts
                );
                self.status.send_modify(|snapshot| {
                    snapshot.last_attempts = Some(outcome.attempts);
                    snapshot.status = RunStatus::Failed;
                });
                Some(RunStatus::Failed)
            }
        }
    }

    async fn finish_stopped(&self) -> RunStatus {
        info!("Watchdog stopped");
        self.notify(&messages::stopped()).await;
        self.set_status(RunStatus::Stopped);
        RunStatus::Stopped
    }

    async fn notify(&self, text: &str) {
        self.sequencer.notifier().notify(text).await;
    }

    /// Update the status. A pending stop is not overwritten by Running.
    fn set_status(&self, status: RunStatus) {
        self.status.send_if_modified(|snapshot| {
            if snapshot.status == status
                || (snapshot.status == RunStatus::Stopping && status == RunStatus::Running)
            {
                return false;
            }
            snapshot.status = status;
            true
        });
    }

    fn publish_progress(&self, percent: u8) {
        self.status.send_if_modified(|snapshot| {
            if snapshot.progress_percent == percent {
                return false;
            }
            snapshot.progress_percent = percent;
            true
        });
    }
}

/// Foreground handle to a spawned [`Watchdog`].
pub struct WatchdogHandle {
    stop: StopSignal,
    status: Arc<watch::Sender<WatchdogSnapshot>>,
    task: Option<JoinHandle<RunStatus>>,
}

impl WatchdogHandle {
    /// Request a stop. Takes effect at the next tick or between attempts.
    pub fn stop(&self) {
        self.stop.request();
        self.status.send_if_modified(|snapshot| {
            if snapshot.status.is_terminal() || snapshot.status == RunStatus::Stopping {
                return false;
            }
            snapshot.status = RunStatus::Stopping;
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<WatchdogSnapshot> {
        self.status.subscribe()
    }

    pub fn status(&self) -> RunStatus {
        self.status.borrow().status
    }

    pub fn snapshot(&self) -> WatchdogSnapshot {
        self.status.borrow().clone()
    }

    /// Wait for the loop to end and return its final status.
    ///
    /// Safe to use inside `select!`: dropping the future early does not
    /// lose the task, and calling again after completion returns at once.
    pub async fn wait(&mut self) -> RunStatus {
        if let Some(task) = self.task.as_mut() {
            let result = task.await;
            self.task = None;
            if let Err(e) = result {
                error!("Watchdog task ended abnormally: {}", e);
                self.status
                    .send_modify(|snapshot| snapshot.status = RunStatus::Error);
            }
        }
        self.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockJoinStrategy, MockNotifier, MockProcessTable};
    use std::time::Duration;

    struct Rig {
        table: Arc<MockProcessTable>,
        join: Arc<MockJoinStrategy>,
        notifier: Arc<MockNotifier>,
        watchdog: Watchdog,
    }

    fn rig(interval: Duration, counts: Vec<usize>, join: MockJoinStrategy) -> Rig {
        let config = fixtures::restart_config(interval);
        let table = Arc::new(
            MockProcessTable::new(&config.target_process, &config.helper_process)
                .with_counts(counts),
        );
        let join = Arc::new(join);
        let notifier = Arc::new(MockNotifier::new());
        let watchdog = Watchdog::new(
            config,
            Timings::default(),
            table.clone(),
            ButtonInvoker::new().with_strategy(join.clone()),
            notifier.clone(),
        );
        Rig {
            table,
            join,
            notifier,
            watchdog,
        }
    }

    fn count_containing(messages: &[String], needle: &str) -> usize {
        messages.iter().filter(|m| m.contains(needle)).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_crash_triggers_crash_restart_not_scheduled() {
        let rig = rig(
            Duration::from_secs(600),
            vec![2, 2, 1, 2],
            MockJoinStrategy::succeeding("mock"),
        );
        let mut handle = rig.watchdog.spawn();

        // ticks at 0, 5, 10 (crash), restart takes 31s
        tokio::time::sleep(Duration::from_secs(45)).await;
        handle.stop();
        assert_eq!(handle.wait().await, RunStatus::Stopped);

        let sent = rig.notifier.messages();
        assert_eq!(count_containing(&sent, "crash"), 1);
        assert_eq!(count_containing(&sent, "Scheduled"), 0);
        assert_eq!(rig.join.call_count(), 1);
        assert_eq!(handle.snapshot().restarts, 1);
        assert!(!rig.table.killed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_crash_on_due_tick_restarts_once() {
        // tick 12 (t=60) is both the interval and the 2 -> 1 drop
        let mut counts = vec![2; 12];
        counts.extend([1, 2]);
        let rig = rig(
            Duration::from_secs(60),
            counts,
            MockJoinStrategy::succeeding("mock"),
        );
        let mut handle = rig.watchdog.spawn();

        // restart runs t=60..91; the next cycle is not due until t=151
        tokio::time::sleep(Duration::from_secs(100)).await;
        handle.stop();
        assert_eq!(handle.wait().await, RunStatus::Stopped);

        let sent = rig.notifier.messages();
        assert_eq!(rig.join.call_count(), 1);
        assert_eq!(count_containing(&sent, "crash"), 1);
        assert_eq!(count_containing(&sent, "Scheduled"), 0);
        assert_eq!(handle.snapshot().restarts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_task_reports_error() {
        struct Exploding;

        #[async_trait::async_trait]
        impl crate::join::JoinStrategy for Exploding {
            fn name(&self) -> &str {
                "exploding"
            }

            async fn attempt(&self) -> Result<()> {
                panic!("join strategy blew up");
            }
        }

        let config = fixtures::restart_config(Duration::from_secs(600));
        let table = Arc::new(
            MockProcessTable::new(&config.target_process, &config.helper_process)
                .with_counts(vec![2, 1]),
        );
        let watchdog = Watchdog::new(
            config,
            Timings::default(),
            table,
            ButtonInvoker::new().with_strategy(Arc::new(Exploding)),
            Arc::new(MockNotifier::new()),
        );
        let mut handle = watchdog.spawn();

        assert_eq!(handle.wait().await, RunStatus::Error);
        assert_eq!(handle.status(), RunStatus::Error);
        assert!(handle.status().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_faster_tick_detects_crash_sooner() {
        let config = fixtures::restart_config(Duration::from_secs(600));
        let table = Arc::new(
            MockProcessTable::new(&config.target_process, &config.helper_process)
                .with_counts(vec![2, 1, 2]),
        );
        let join = Arc::new(MockJoinStrategy::succeeding("mock"));
        let notifier = Arc::new(MockNotifier::new());
        let watchdog = Watchdog::new(
            config,
            Timings::default().with_tick(Duration::from_secs(1)),
            table,
            ButtonInvoker::new().with_strategy(join.clone()),
            notifier.clone(),
        );
        let mut handle = watchdog.spawn();

        // crash seen at t=1, restart verified at t=32
        tokio::time::sleep(Duration::from_secs(33)).await;
        assert_eq!(handle.snapshot().restarts, 1);
        handle.stop();
        handle.wait().await;
        assert_eq!(join.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_count_does_not_restart() {
        let rig = rig(
            Duration::from_secs(600),
            vec![2],
            MockJoinStrategy::succeeding("mock"),
        );
        let mut handle = rig.watchdog.spawn();

        tokio::time::sleep(Duration::from_secs(120)).await;
        handle.stop();
        handle.wait().await;

        assert_eq!(rig.join.call_count(), 0);
        assert!(rig.table.killed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_sent_once_at_threshold() {
        let rig = rig(
            Duration::from_secs(120),
            vec![2],
            MockJoinStrategy::succeeding("mock"),
        );
        let mut rx = rig.watchdog.subscribe();
        let mut handle = rig.watchdog.spawn();

        tokio::time::sleep(Duration::from_secs(58)).await;
        assert_eq!(count_containing(&rig.notifier.messages(), "restart at"), 0);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count_containing(&rig.notifier.messages(), "restart at"), 1);

        // still before the scheduled restart at t=120
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(count_containing(&rig.notifier.messages(), "restart at"), 1);
        assert!(rx.borrow_and_update().progress_percent >= 90);

        handle.stop();
        handle.wait().await;
        assert_eq!(rig.join.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_restart_starts_new_cycle() {
        let rig = rig(
            Duration::from_secs(120),
            vec![2],
            MockJoinStrategy::succeeding("mock"),
        );
        let mut handle = rig.watchdog.spawn();

        // scheduled restart at t=120 finishes at t=151
        tokio::time::sleep(Duration::from_secs(160)).await;
        let sent = rig.notifier.messages();
        assert_eq!(count_containing(&sent, "Scheduled"), 1);
        assert_eq!(count_containing(&sent, "restart at"), 1);
        assert_eq!(handle.snapshot().restarts, 1);
        assert_eq!(handle.snapshot().last_attempts, Some(1));

        // the next cycle warns again 60s after the restart
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count_containing(&rig.notifier.messages(), "restart at"), 2);

        handle.stop();
        handle.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_minute_interval_warns_on_first_tick() {
        let rig = rig(
            Duration::from_secs(60),
            vec![2],
            MockJoinStrategy::succeeding("mock"),
        );
        let mut handle = rig.watchdog.spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let sent = rig.notifier.messages();
        assert_eq!(count_containing(&sent, "restart at"), 1);
        assert!(sent.iter().any(|m| m.contains("in 1m")));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count_containing(&rig.notifier.messages(), "restart at"), 1);

        handle.stop();
        handle.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_restart_halts_loop() {
        let rig = rig(
            Duration::from_secs(60),
            vec![2, 0],
            MockJoinStrategy::failing("mock"),
        );
        let mut handle = rig.watchdog.spawn();

        assert_eq!(handle.wait().await, RunStatus::Failed);
        assert_eq!(rig.join.call_count(), 3);

        let sent = rig.notifier.messages();
        assert!(sent.last().unwrap().contains("failed after 3 attempts"));
        assert_eq!(count_containing(&sent, "stopped"), 0);
        assert_eq!(handle.status(), RunStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_restart_waits_for_attempt() {
        let rig = rig(
            Duration::from_secs(600),
            vec![2, 1, 0],
            MockJoinStrategy::failing("mock"),
        );
        let mut handle = rig.watchdog.spawn();

        // crash at t=5, first attempt verifies at t=36
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.stop();
        assert_eq!(handle.status(), RunStatus::Stopping);

        assert_eq!(handle.wait().await, RunStatus::Stopped);
        assert_eq!(rig.join.call_count(), 1);
        let sent = rig.notifier.messages();
        assert_eq!(count_containing(&sent, "/3"), 0);
        assert!(sent.last().unwrap().contains("stopped"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick() {
        let rig = rig(
            Duration::from_secs(600),
            vec![2],
            MockJoinStrategy::succeeding("mock"),
        );
        let stop = StopSignal::new();
        stop.request();

        assert_eq!(rig.watchdog.run(&stop).await, RunStatus::Stopped);
        let sent = rig.notifier.messages();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("started"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_repeatable() {
        let rig = rig(
            Duration::from_secs(600),
            vec![2],
            MockJoinStrategy::succeeding("mock"),
        );
        let mut handle = rig.watchdog.spawn();
        handle.stop();
        assert_eq!(handle.wait().await, RunStatus::Stopped);
        assert_eq!(handle.wait().await, RunStatus::Stopped);
    }
}

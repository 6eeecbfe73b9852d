//! One full client restart with bounded retries.

use super::state::RestartOutcome;
use super::stop::StopSignal;
use super::timing::Timings;
use crate::config::RestartConfig;
use crate::join::ButtonInvoker;
use crate::notify::{messages, Notifier};
use crate::process::{ProcessCounter, ProcessTable, ProcessTerminator};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs the restart protocol: notify, terminate, then up to
/// `max_attempts` rounds of settle, join, verify.
///
/// Nothing inside an attempt is interruptible. The stop signal is only
/// consulted between attempts.
pub struct RestartSequencer {
    counter: ProcessCounter,
    terminator: ProcessTerminator,
    invoker: ButtonInvoker,
    notifier: Arc<dyn Notifier>,
    timings: Timings,
    limit_helpers: bool,
    escalation_id: Option<String>,
}

impl RestartSequencer {
    pub fn new(
        config: &RestartConfig,
        timings: Timings,
        table: Arc<dyn ProcessTable>,
        invoker: ButtonInvoker,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            counter: ProcessCounter::new(table.clone(), &config.target_process),
            terminator: ProcessTerminator::new(table, &config.target_process, &config.helper_process),
            invoker,
            notifier,
            timings,
            limit_helpers: config.limit_helpers,
            escalation_id: config.escalation_id.clone(),
        }
    }

    /// Client count as seen by this sequencer.
    pub async fn count(&self) -> usize {
        self.counter.count().await
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Restart the clients, announcing `reason` first.
    pub async fn perform(&self, reason: &str, stop: &StopSignal) -> RestartOutcome {
        let max = self.timings.max_attempts;
        self.notifier.notify(reason).await;
        self.terminator.terminate_all().await;

        for attempt in 1..=max {
            tokio::time::sleep(self.timings.settle).await;
            match self.invoker.invoke().await {
                Some(strategy) => debug!("Attempt {}/{}: join via {}", attempt, max, strategy),
                None => debug!("Attempt {}/{}: join not triggered", attempt, max),
            }
            tokio::time::sleep(self.timings.verify).await;

            let count = self.counter.count().await;
            if count > 0 {
                info!(
                    "Restart succeeded on attempt {}/{} ({} client(s) running)",
                    attempt, max, count
                );
                if self.limit_helpers {
                    self.terminator.cap_helpers().await;
                }
                return RestartOutcome::succeeded(attempt);
            }

            if attempt == max {
                break;
            }
            if stop.is_requested() {
                info!("Stop requested; abandoning restart after attempt {}", attempt);
                return RestartOutcome::cancelled(attempt);
            }
            warn!("Attempt {}/{} left no client running", attempt, max);
            self.notifier.notify(&messages::retry(attempt, max)).await;
            self.terminator.terminate_all().await;
        }

        error!("Restart failed after {} attempts", max);
        self.notifier
            .notify(&messages::failure(max, self.escalation_id.as_deref()))
            .await;
        RestartOutcome::failed(max)
    }
}

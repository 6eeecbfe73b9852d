//! Triggering the account manager's "join" action.
//!
//! A [`ButtonInvoker`] holds an ordered list of [`JoinStrategy`]s and tries
//! them in turn; the first one that succeeds ends the attempt. Failures are
//! logged and swallowed; a join that never happened shows up later as a
//! client count of zero.
//!
//! ```text
//! ButtonInvoker::invoke()
//!    │
//!    ├─► UiAutomationJoin   (find window, find control, wait, invoke)
//!    │        │ fails
//!    │        ▼
//!    └─► PointerClickJoin   (only with a saved click position)
//! ```

pub mod pointer;
pub mod ui;

pub use pointer::PointerClickJoin;
pub use ui::UiAutomationJoin;

use crate::config::RestartConfig;
use crate::error::{IntoRejoinError, RejoinError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One way of pressing the join button.
#[async_trait]
pub trait JoinStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Try to press the button once.
    ///
    /// # Errors
    ///
    /// Returns an error when the button could not be pressed; the invoker
    /// moves on to the next strategy.
    async fn attempt(&self) -> Result<()>;
}

#[async_trait]
impl<T: JoinStrategy + ?Sized> JoinStrategy for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn attempt(&self) -> Result<()> {
        (**self).attempt().await
    }
}

/// Ordered chain of join strategies.
#[derive(Default)]
pub struct ButtonInvoker {
    strategies: Vec<Box<dyn JoinStrategy>>,
}

impl ButtonInvoker {
    /// Create an invoker with no strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy to the end of the chain.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl JoinStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Standard chain: UI automation, then the saved click position if any.
    pub fn for_config(config: &RestartConfig, control_wait: Duration) -> Self {
        let mut invoker = Self::new().with_strategy(UiAutomationJoin::new(
            &config.manager_window,
            &config.join_control,
            control_wait,
        ));
        if let Some(point) = config.click_point {
            invoker = invoker.with_strategy(PointerClickJoin::new(point));
        }
        invoker
    }

    /// Names of the strategies, in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order.
    ///
    /// Returns the name of the strategy that worked, or `None` if all failed.
    pub async fn invoke(&self) -> Option<String> {
        for strategy in &self.strategies {
            match strategy.attempt().await {
                Ok(()) => {
                    info!("Join triggered via {}", strategy.name());
                    return Some(strategy.name().to_string());
                }
                Err(e) if e.is_recoverable() => {
                    debug!("Join via {} failed: {}", strategy.name(), e)
                }
                Err(e) => warn!("Join via {} failed: {}", strategy.name(), e),
            }
        }
        warn!("No join strategy succeeded");
        None
    }
}

/// Run an external tool with a deadline and return its exit code.
pub(crate) async fn run_tool(program: &str, args: &[String], deadline: Duration) -> Result<i32> {
    let path = which::which(program).map_err(|_| RejoinError::MissingTool {
        tool: program.to_string(),
    })?;

    let child = Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .into_rejoin_tool(program)?;

    let output = tokio::time::timeout(deadline, child.wait_with_output())
        .await
        .map_err(|_| RejoinError::tool(program, format!("timed out after {deadline:?}")))?
        .into_rejoin_tool(program)?;

    if !output.stderr.is_empty() {
        debug!(
            "{} stderr: {}",
            program,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    output
        .status
        .code()
        .ok_or_else(|| RejoinError::tool(program, "terminated by signal"))
}

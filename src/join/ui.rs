//! Join through the Windows UI Automation tree.
//!
//! The lookup runs as a PowerShell script so no native bindings are needed:
//! find the top-level window by title, find the join control by name, wait
//! for it to become enabled, then invoke it.

use super::{run_tool, JoinStrategy};
use crate::error::{RejoinError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Script exit code: manager window not found
const EXIT_NO_WINDOW: i32 = 2;
/// Script exit code: control missing or never enabled
const EXIT_NOT_READY: i32 = 3;

/// Extra time the PowerShell host gets on top of the control wait.
const HOST_STARTUP_SLACK: Duration = Duration::from_secs(10);

/// Presses a named control in the account manager window.
#[derive(Debug, Clone)]
pub struct UiAutomationJoin {
    window_title: String,
    control_name: String,
    control_wait: Duration,
}

impl UiAutomationJoin {
    pub fn new(window_title: &str, control_name: &str, control_wait: Duration) -> Self {
        Self {
            window_title: window_title.to_string(),
            control_name: control_name.to_string(),
            control_wait,
        }
    }

    /// The PowerShell program that performs the lookup and invocation.
    pub fn script(&self) -> String {
        format!(
            r#"$ErrorActionPreference = 'Stop'
Add-Type -AssemblyName UIAutomationClient
Add-Type -AssemblyName UIAutomationTypes
$ae = [System.Windows.Automation.AutomationElement]
$scope = [System.Windows.Automation.TreeScope]
$byWindow = New-Object System.Windows.Automation.PropertyCondition($ae::NameProperty, '{window}')
$window = $ae::RootElement.FindFirst($scope::Children, $byWindow)
if ($null -eq $window) {{ exit {no_window} }}
$byControl = New-Object System.Windows.Automation.PropertyCondition($ae::NameProperty, '{control}')
$deadline = (Get-Date).AddMilliseconds({wait_ms})
do {{
    $control = $window.FindFirst($scope::Descendants, $byControl)
    if ($null -ne $control -and $control.Current.IsEnabled) {{
        $control.GetCurrentPattern([System.Windows.Automation.InvokePattern]::Pattern).Invoke()
        exit 0
    }}
    Start-Sleep -Milliseconds 250
}} while ((Get-Date) -lt $deadline)
exit {not_ready}
"#,
            window = ps_quote(&self.window_title),
            control = ps_quote(&self.control_name),
            wait_ms = self.control_wait.as_millis(),
            no_window = EXIT_NO_WINDOW,
            not_ready = EXIT_NOT_READY,
        )
    }

    fn describe_exit(&self, code: i32) -> String {
        match code {
            EXIT_NO_WINDOW => format!("window '{}' not found", self.window_title),
            EXIT_NOT_READY => format!(
                "control '{}' not ready within {:?}",
                self.control_name, self.control_wait
            ),
            other => format!("UI automation script exited with {other}"),
        }
    }
}

/// Escape a value for a single-quoted PowerShell string.
fn ps_quote(value: &str) -> String {
    value.replace('\'', "''")
}

#[async_trait]
impl JoinStrategy for UiAutomationJoin {
    fn name(&self) -> &str {
        "ui-automation"
    }

    async fn attempt(&self) -> Result<()> {
        if !cfg!(windows) {
            return Err(RejoinError::MissingTool {
                tool: "UI Automation (Windows only)".to_string(),
            });
        }

        let args = vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            self.script(),
        ];
        match run_tool("powershell", &args, self.control_wait + HOST_STARTUP_SLACK).await? {
            0 => Ok(()),
            code => Err(RejoinError::tool("powershell", self.describe_exit(code))),
        }
    }
}

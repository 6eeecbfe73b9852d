//! Join by clicking a saved screen position.

use super::{run_tool, JoinStrategy};
use crate::config::ScreenPoint;
use crate::error::{RejoinError, Result};
use async_trait::async_trait;
use std::time::Duration;

const CLICK_DEADLINE: Duration = Duration::from_secs(10);

/// Moves the pointer to a fixed position and left-clicks.
#[derive(Debug, Clone)]
pub struct PointerClickJoin {
    point: ScreenPoint,
}

impl PointerClickJoin {
    pub fn new(point: ScreenPoint) -> Self {
        Self { point }
    }

    /// Program and arguments that perform the click on this platform.
    pub fn command(&self) -> (&'static str, Vec<String>) {
        let ScreenPoint { x, y } = self.point;
        if cfg!(windows) {
            let script = format!(
                r#"Add-Type -Namespace Rejoin -Name Pointer -MemberDefinition '
[DllImport("user32.dll")] public static extern bool SetCursorPos(int x, int y);
[DllImport("user32.dll")] public static extern void mouse_event(uint f, uint dx, uint dy, uint d, System.UIntPtr e);'
[Rejoin.Pointer]::SetCursorPos({x}, {y}) | Out-Null
[Rejoin.Pointer]::mouse_event(0x0002, 0, 0, 0, [System.UIntPtr]::Zero)
[Rejoin.Pointer]::mouse_event(0x0004, 0, 0, 0, [System.UIntPtr]::Zero)
"#
            );
            (
                "powershell",
                vec![
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    script,
                ],
            )
        } else {
            (
                "xdotool",
                vec![
                    "mousemove".to_string(),
                    "--sync".to_string(),
                    // negative coordinates must not parse as options
                    "--".to_string(),
                    x.to_string(),
                    y.to_string(),
                    "click".to_string(),
                    "1".to_string(),
                ],
            )
        }
    }
}

#[async_trait]
impl JoinStrategy for PointerClickJoin {
    fn name(&self) -> &str {
        "pointer-click"
    }

    async fn attempt(&self) -> Result<()> {
        let (program, args) = self.command();
        match run_tool(program, &args, CLICK_DEADLINE).await? {
            0 => Ok(()),
            code => Err(RejoinError::tool(
                program,
                format!("click at {} exited with {code}", self.point),
            )),
        }
    }
}

//! Custom error types for rejoin.
//!
//! This module provides structured error types that separate configuration
//! problems (rejected before monitoring starts) from the transient failures
//! the watchdog logs and rides out.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rejoin operations
#[derive(Error, Debug)]
pub enum RejoinError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load or store settings
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Watchdog Errors
    // =========================================================================
    /// Every restart attempt left the client count at zero
    #[error("Restart failed after {attempts} attempts")]
    RestartExhausted { attempts: u32 },

    /// The background monitoring task died
    #[error("Watchdog task failed: {message}")]
    Task { message: String },

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// Missing required tool
    #[error("Missing required tool: {tool}")]
    MissingTool { tool: String },

    /// Tool execution failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Process enumeration or termination failed
    #[error("Process {pid} could not be terminated: {message}")]
    Process { pid: u32, message: String },

    /// Webhook delivery failed
    #[error("Notification to {endpoint} failed: {message}")]
    Notification { endpoint: String, message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RejoinError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid-field error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a tool execution error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a notification delivery error
    pub fn notification(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notification {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is logged and ridden out by the watchdog
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ToolExecution { .. }
                | Self::MissingTool { .. }
                | Self::Process { .. }
                | Self::Notification { .. }
        )
    }

    /// Check if this error ends the monitoring run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RestartExhausted { .. } | Self::Task { .. })
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RestartExhausted { .. } => 3,
            Self::Task { .. } => 4,
            Self::MissingTool { .. } => 6,
            Self::Config { .. } | Self::InvalidConfig { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for rejoin results
pub type Result<T> = std::result::Result<T, RejoinError>;

/// Extension trait for converting foreign errors to RejoinError
pub trait IntoRejoinError<T> {
    fn into_rejoin_config(self) -> Result<T>;
    fn into_rejoin_tool(self, tool: &str) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoRejoinError<T> for std::result::Result<T, E> {
    fn into_rejoin_config(self) -> Result<T> {
        self.map_err(|e| RejoinError::config(e.into().to_string()))
    }

    fn into_rejoin_tool(self, tool: &str) -> Result<T> {
        self.map_err(|e| RejoinError::tool(tool, e.into().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RejoinError::RestartExhausted { attempts: 3 };
        assert_eq!(err.to_string(), "Restart failed after 3 attempts");

        let err = RejoinError::invalid("intervalMinutes", "must be between 1 and 999");
        assert!(err.to_string().contains("intervalMinutes"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(RejoinError::tool("xdotool", "exit 1").is_recoverable());
        assert!(RejoinError::notification("discord.com", "timeout").is_recoverable());
        assert!(RejoinError::Process {
            pid: 42,
            message: "access denied".into()
        }
        .is_recoverable());
        assert!(!RejoinError::RestartExhausted { attempts: 3 }.is_recoverable());
    }

    #[test]
    fn test_is_fatal() {
        assert!(RejoinError::RestartExhausted { attempts: 3 }.is_fatal());
        assert!(RejoinError::Task {
            message: "panicked".into()
        }
        .is_fatal());
        assert!(!RejoinError::tool("powershell", "exit 2").is_fatal());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RejoinError::RestartExhausted { attempts: 3 }.exit_code(), 3);
        assert_eq!(RejoinError::config("test").exit_code(), 7);
        assert_eq!(RejoinError::invalid("x", "y").exit_code(), 7);
        assert_eq!(
            RejoinError::MissingTool {
                tool: "xdotool".into()
            }
            .exit_code(),
            6
        );
        assert_eq!(RejoinError::tool("a", "b").exit_code(), 1);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/test/settings.json");
        let err = RejoinError::config_with_path("failed to parse", path.clone());
        if let RejoinError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_into_rejoin_error_trait() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "program not found",
        ));

        match result.into_rejoin_tool("xdotool") {
            Err(RejoinError::ToolExecution { tool, message }) => {
                assert_eq!(tool, "xdotool");
                assert!(message.contains("program not found"));
            }
            other => panic!("Wrong error variant after conversion: {other:?}"),
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: RejoinError = io_err.into();
        assert!(matches!(err, RejoinError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}

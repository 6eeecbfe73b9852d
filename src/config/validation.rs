//! Settings validation.
//!
//! Every problem with a settings record is collected into a
//! [`ValidationReport`] so the user sees all of them at once. The watchdog
//! never starts from a record with errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use rejoin::config::Settings;
//!
//! let settings = Settings::load_or_default(&Settings::default_path());
//! match settings.to_restart_config() {
//!     Ok(config) => println!("interval: {:?}", config.interval),
//!     Err(report) => {
//!         for error in &report.errors {
//!             eprintln!("Error: {}", error);
//!         }
//!         std::process::exit(report.exit_code());
//!     }
//! }
//! ```

use super::{Settings, MAX_INTERVAL_MINUTES, MAX_WEBHOOKS, MIN_INTERVAL_MINUTES};
use regex::Regex;
use std::sync::OnceLock;

/// Shape of a Discord webhook URL.
fn webhook_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^https://(?:(?:ptb|canary)\.)?discord(?:app)?\.com/api(?:/v\d+)?/webhooks/\d+/[A-Za-z0-9_\-]+/?$",
            )
            .ok()
        })
        .as_ref()
}

/// Check whether a URL looks like a webhook endpoint we can post to.
pub fn is_webhook_url(url: &str) -> bool {
    webhook_pattern().is_some_and(|re| re.is_match(url.trim()))
}

/// One rejected settings field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Settings key, as it appears in the file
    pub field: &'static str,
    pub reason: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Result of settings validation.
///
/// # Example
///
/// ```rust,ignore
/// use rejoin::config::ValidationReport;
///
/// let report = ValidationReport::new();
/// assert!(report.is_valid()); // Empty report is valid
/// assert_eq!(report.exit_code(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Errors that prevent the watchdog from starting.
    pub errors: Vec<FieldError>,
    /// Warnings that don't prevent a start but deserve attention.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create a new empty validation report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no errors. Warnings do not affect validity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns 0 if valid, 7 (configuration error) otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_valid() {
            0
        } else {
            7
        }
    }

    /// Generate a one-line summary of the validation result.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_valid() {
            if self.warnings.is_empty() {
                "Configuration is valid.".to_string()
            } else {
                format!(
                    "Configuration is valid with {} warning(s).",
                    self.warnings.len()
                )
            }
        } else {
            format!(
                "Configuration is invalid with {} error(s).",
                self.errors.len()
            )
        }
    }

    fn error(&mut self, field: &'static str, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            reason: reason.into(),
        });
    }
}

impl Settings {
    /// Check every field and collect the problems.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();

        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.interval_minutes) {
            report.error(
                "intervalMinutes",
                format!(
                    "must be between {} and {} (got {})",
                    MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES, self.interval_minutes
                ),
            );
        }

        if self.webhook_urls.len() > MAX_WEBHOOKS {
            report.error(
                "webhookUrls",
                format!(
                    "at most {} webhooks are supported (got {})",
                    MAX_WEBHOOKS,
                    self.webhook_urls.len()
                ),
            );
        }
        for url in self.active_webhooks() {
            if !is_webhook_url(url) {
                report.error("webhookUrls", format!("not a Discord webhook URL: {url}"));
            }
        }
        if self.active_webhooks().next().is_none() {
            report.error("webhookUrls", "at least one webhook URL is required");
        }

        match (self.click_x, self.click_y) {
            (Some(_), None) => report.error("clickY", "clickX is set but clickY is missing"),
            (None, Some(_)) => report.error("clickX", "clickY is set but clickX is missing"),
            (None, None) => report
                .warnings
                .push("No click position saved; only UI automation will be used to join".into()),
            (Some(_), Some(_)) => {}
        }

        let escalation = self.escalation_id.trim();
        if !escalation.is_empty() && !escalation.chars().all(|c| c.is_ascii_digit()) {
            report.warnings.push(format!(
                "escalationId '{escalation}' is not a numeric user id; the mention may not resolve"
            ));
        }

        if self.target_process.trim().is_empty() {
            report.error("targetProcess", "must not be empty");
        }
        if self.helper_process.trim().is_empty() {
            report.error("helperProcess", "must not be empty");
        }
        if self.crash_floor == 0 {
            report.error("crashFloor", "must be at least 1");
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOOK: &str = "https://discord.com/api/webhooks/1234567890/AbC-def_123";

    fn valid() -> Settings {
        Settings {
            webhook_urls: vec![HOOK.to_string()],
            click_x: Some(100),
            click_y: Some(200),
            ..Settings::default()
        }
    }

    #[test]
    fn test_valid_settings() {
        let report = valid().validate();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.summary(), "Configuration is valid.");
    }

    #[test]
    fn test_interval_bounds() {
        for minutes in [1, 28, 999] {
            let settings = Settings {
                interval_minutes: minutes,
                ..valid()
            };
            assert!(settings.validate().is_valid(), "{minutes} should be valid");
        }
        for minutes in [0, 1000] {
            let settings = Settings {
                interval_minutes: minutes,
                ..valid()
            };
            let report = settings.validate();
            assert!(!report.is_valid());
            assert_eq!(report.errors[0].field, "intervalMinutes");
        }
    }

    #[test]
    fn test_no_endpoints_rejected() {
        let settings = Settings {
            webhook_urls: vec![String::new(), " ".to_string()],
            ..valid()
        };
        let report = settings.validate();
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| e.reason.contains("at least one webhook")));
        assert_eq!(report.exit_code(), 7);
    }

    #[test]
    fn test_malformed_endpoint_rejected() {
        let settings = Settings {
            webhook_urls: vec![HOOK.to_string(), "http://example.com/hook".to_string()],
            ..valid()
        };
        let report = settings.validate();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].reason.contains("example.com"));
    }

    #[test]
    fn test_too_many_endpoints_rejected() {
        let settings = Settings {
            webhook_urls: vec![HOOK.to_string(); 3],
            ..valid()
        };
        assert!(!settings.validate().is_valid());
    }

    #[test]
    fn test_webhook_shapes() {
        assert!(is_webhook_url(HOOK));
        assert!(is_webhook_url("https://discordapp.com/api/webhooks/1/x"));
        assert!(is_webhook_url("https://canary.discord.com/api/v10/webhooks/1/x"));
        assert!(!is_webhook_url("https://discord.com/api/webhooks/abc/x"));
        assert!(!is_webhook_url("https://evil.com/discord.com/api/webhooks/1/x"));
        assert!(!is_webhook_url(""));
    }

    #[test]
    fn test_half_coordinate_rejected() {
        let settings = Settings {
            click_y: None,
            ..valid()
        };
        let report = settings.validate();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "clickY");
    }

    #[test]
    fn test_missing_coordinate_is_only_a_warning() {
        let settings = Settings {
            click_x: None,
            click_y: None,
            ..valid()
        };
        let report = settings.validate();
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.summary().contains("1 warning"));
    }

    #[test]
    fn test_non_numeric_escalation_warns() {
        let settings = Settings {
            escalation_id: "ops-team".to_string(),
            ..valid()
        };
        let report = settings.validate();
        assert!(report.is_valid());
        assert!(report.warnings[0].contains("ops-team"));
    }

    #[test]
    fn test_to_restart_config() {
        let config = valid().to_restart_config().unwrap();
        assert_eq!(config.interval_minutes(), 28);
        assert_eq!(config.endpoints, vec![HOOK.to_string()]);

        let report = Settings::default().to_restart_config().unwrap_err();
        assert!(!report.is_valid());
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError {
            field: "crashFloor",
            reason: "must be at least 1".into(),
        };
        assert_eq!(err.to_string(), "crashFloor: must be at least 1");
    }
}

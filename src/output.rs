//! # Output Configuration
//!
//! This module provides utilities for controlling CLI output appearance,
//! including color and emoji support based on terminal capabilities and
//! user preferences, and the end-of-run failure report.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codesync::output::{format_report, OutputConfig};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! eprint!("{}", format_report(&config, &report));
//! ```

use std::env;
use std::fmt::Write;

use console::style;

use crate::sync::SyncReport;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// - `--color=always`: Force colors on (overrides NO_COLOR)
    /// - `--color=never`: Force colors off
    /// - `--color=auto`: Detect based on environment
    ///
    /// In auto mode, colors are disabled if `NO_COLOR` is set, `CLICOLOR=0`
    /// is set, `TERM=dumb` is set, or stderr is not a TTY (unless
    /// `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        // The report goes to stderr
        console::Term::stderr().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Render the failures of a pass: a count, then each failure with the job
/// it belongs to. Empty when the pass succeeded.
pub fn format_report(config: &OutputConfig, report: &SyncReport) -> String {
    let mut out = String::new();
    if report.failures.is_empty() {
        return out;
    }

    let _ = writeln!(out, "{}", "*".repeat(80));
    let _ = writeln!(
        out,
        "{} {}",
        emoji(config, "❌", "[ERR]"),
        style(format!("Errors: {}", report.failures.len()))
            .red()
            .bold()
            .force_styling(config.use_color)
    );
    for (i, failure) in report.failures.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {}",
            i + 1,
            style(&failure.context).bold().force_styling(config.use_color)
        );
        for line in failure.error.to_string().lines() {
            let _ = writeln!(out, "     {}", line);
        }
    }
    if report.cancelled {
        let _ = writeln!(
            out,
            "{} {}",
            emoji(config, "⚠️", "[WARN]"),
            style("Interrupted, some repositories were not synced")
                .yellow()
                .force_styling(config.use_color)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sync::Failure;

    #[test]
    fn test_color_always() {
        let config = OutputConfig::from_env_and_flag("always");
        assert!(config.use_color);
    }

    #[test]
    fn test_color_never() {
        let config = OutputConfig::from_env_and_flag("NEVER");
        assert!(!config.use_color);
    }

    #[test]
    fn test_emoji_helper_with_color() {
        let config = OutputConfig::with_color();
        assert_eq!(emoji(&config, "✅", "[OK]"), "✅");
    }

    #[test]
    fn test_emoji_helper_without_color() {
        let config = OutputConfig::without_color();
        assert_eq!(emoji(&config, "✅", "[OK]"), "[OK]");
    }

    #[test]
    fn test_report_empty_on_success() {
        let report = SyncReport::default();
        assert_eq!(format_report(&OutputConfig::without_color(), &report), "");
    }

    #[test]
    fn test_report_lists_failures_with_context() {
        let report = SyncReport {
            failures: vec![
                Failure {
                    context: "github.com/acme/stray".to_string(),
                    error: Error::GitCommand {
                        command: "git pull".to_string(),
                        path: "/src/github.com/acme/stray".to_string(),
                        stderr: "fatal: no upstream".to_string(),
                    },
                },
                Failure {
                    context: "sync".to_string(),
                    error: Error::Cancelled {
                        context: "interrupted".to_string(),
                    },
                },
            ],
            cancelled: true,
        };
        let text = format_report(&OutputConfig::without_color(), &report);
        assert!(text.contains("[ERR] Errors: 2"));
        assert!(text.contains("  1. github.com/acme/stray"));
        assert!(text.contains("  2. sync"));
        assert!(text.contains("fatal: no upstream"));
        assert!(text.contains("[WARN] Interrupted"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_report_colors_when_enabled() {
        let report = SyncReport {
            failures: vec![Failure {
                context: "github.com/acme".to_string(),
                error: Error::Cancelled {
                    context: "x".to_string(),
                },
            }],
            cancelled: false,
        };
        let text = format_report(&OutputConfig::with_color(), &report);
        assert!(text.contains('\u{1b}'));
    }
}

//! Color and styling utilities with support for NO_COLOR and TERM environment variables.
//!
//! Colors are disabled by any of:
//! - `--no-color` CLI flag
//! - `NO_COLOR` environment variable (https://no-color.org/)
//! - `BOXTALLY_NO_COLOR` environment variable
//! - `TERM=dumb`
//! - stderr not being a TTY

use colored::ColoredString;
use std::io::{stderr, IsTerminal};
use std::sync::OnceLock;

static COLOR_CONFIG: OnceLock<ColorConfig> = OnceLock::new();

fn should_disable_colors_from_env() -> bool {
    !std::env::var("NO_COLOR").unwrap_or_default().is_empty()
        || !std::env::var("BOXTALLY_NO_COLOR")
            .unwrap_or_default()
            .is_empty()
        || std::env::var("TERM").unwrap_or_default() == "dumb"
        || !stderr().is_terminal()
}

#[derive(Debug, Clone)]
struct ColorConfig {
    colors_enabled: bool,
}

impl ColorConfig {
    fn new(no_color_flag: bool) -> Self {
        let colors_enabled = !no_color_flag && !should_disable_colors_from_env();
        Self { colors_enabled }
    }
}

/// Initialize the color configuration with the CLI flag state.
/// Call once at startup, after parsing CLI arguments.
pub fn init_color_config(no_color_flag: bool) {
    let config = ColorConfig::new(no_color_flag);
    COLOR_CONFIG.set(config).unwrap_or_else(|_| {
        eprintln!("Warning: Color configuration already initialized");
    });
}

fn colors_enabled() -> bool {
    COLOR_CONFIG
        .get()
        .map(|config| config.colors_enabled)
        .unwrap_or_else(|| !should_disable_colors_from_env())
}

/// Apply color to a string only if colors are enabled for stderr output
pub fn maybe_color_stderr<F>(text: &str, color_fn: F) -> String
where
    F: FnOnce(&str) -> ColoredString,
{
    if colors_enabled() {
        color_fn(text).to_string()
    } else {
        text.to_string()
    }
}

/// Semantic color functions for log levels
pub mod colors {
    use super::maybe_color_stderr;
    use colored::Colorize;

    pub fn error_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.red().bold())
    }

    pub fn warning_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.yellow())
    }

    pub fn info_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.green())
    }

    pub fn debug_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.blue())
    }

    pub fn trace_level(text: &str) -> String {
        maybe_color_stderr(text, |s| s.magenta())
    }
}

/// Semantic symbols for different operation types and states
pub mod symbols {
    use super::colors_enabled;

    /// Symbol for loading and scaling a log
    pub fn parse_start() -> &'static str {
        if colors_enabled() {
            "📄 "
        } else {
            ""
        }
    }

    /// Symbol for class statistics
    pub fn stats_start() -> &'static str {
        if colors_enabled() {
            "📊 "
        } else {
            ""
        }
    }

    /// Symbol for redrawing detections onto frames
    pub fn replay_start() -> &'static str {
        if colors_enabled() {
            "🖍️ "
        } else {
            "[REPLAY] "
        }
    }

    pub fn resources_found() -> &'static str {
        if colors_enabled() {
            "🎯 "
        } else {
            ""
        }
    }

    pub fn operation_failed() -> &'static str {
        if colors_enabled() {
            "❌ "
        } else {
            "[FAILED] "
        }
    }

    pub fn completed_successfully() -> &'static str {
        if colors_enabled() {
            "✅ "
        } else {
            "[SUCCESS] "
        }
    }

    pub fn completed_partially_successfully() -> &'static str {
        if colors_enabled() {
            "⚠️ "
        } else {
            "[PARTIAL-SUCCESS] "
        }
    }

    pub fn warning() -> &'static str {
        if colors_enabled() {
            "⚠️ "
        } else {
            ""
        }
    }
}

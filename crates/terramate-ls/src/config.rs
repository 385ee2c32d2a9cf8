//! Server configuration parsed from environment variables.
//!
//! This module provides configuration types and parsing for the language
//! server. All settings can be overridden via environment variables prefixed
//! with `TERRAMATE_LS_`.

use std::env;
use std::str::FromStr;

use crate::error::ServerError;

/// Log level enumeration matching tracing crate levels.
///
/// Defaults to `Info` when not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Most verbose logging, includes all trace spans.
    Trace,
    /// Debug-level information for development.
    Debug,
    /// Standard informational messages.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for failures.
    Error,
}

impl FromStr for LogLevel {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ServerError::InvalidConfig(format!(
                "unknown log level '{s}', expected one of: trace, debug, info, warn, error"
            ))),
        }
    }
}

impl LogLevel {
    /// Convert to a tracing filter directive string.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Output format of the log records written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines with ANSI colours.
    Console,
    /// Human-readable lines without colours.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

impl FromStr for LogFormat {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ServerError::InvalidConfig(format!(
                "unknown log format '{s}', expected one of: console, text, json"
            ))),
        }
    }
}

/// Configuration for the language server.
///
/// All settings can be overridden via environment variables prefixed with
/// `TERRAMATE_LS_`.
///
/// # Environment Variables
///
/// - `TERRAMATE_LS_LOG_LEVEL`: Sets the log level (trace, debug, info, warn,
///   error)
/// - `TERRAMATE_LS_LOG_FMT`: Sets the log format (console, text, json)
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: LogLevel,
    /// Log record format.
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `TERRAMATE_LS_LOG_LEVEL` and `TERRAMATE_LS_LOG_FMT`.
    /// Falls back to defaults for missing values.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidConfig` if an environment variable contains
    /// an invalid value.
    pub fn from_env() -> Result<Self, ServerError> {
        let log_level = match env::var("TERRAMATE_LS_LOG_LEVEL") {
            Ok(val) => val.parse()?,
            Err(_) => LogLevel::default(),
        };

        let log_format = match env::var("TERRAMATE_LS_LOG_FMT") {
            Ok(val) => val.parse()?,
            Err(_) => LogFormat::default(),
        };

        Ok(Self {
            log_level,
            log_format,
        })
    }

    /// Apply optional overrides to an existing configuration.
    ///
    /// This is intended for CLI overrides that should take precedence over
    /// environment-based defaults.
    #[must_use]
    pub fn apply_overrides(
        mut self,
        log_level: Option<LogLevel>,
        log_format: Option<LogFormat>,
    ) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }

        if let Some(format) = log_format {
            self.log_format = format;
        }

        self
    }

    /// Create a new configuration with the specified log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("trace", LogLevel::Trace)]
    #[case("debug", LogLevel::Debug)]
    #[case("info", LogLevel::Info)]
    #[case("warn", LogLevel::Warn)]
    #[case("warning", LogLevel::Warn)]
    #[case("error", LogLevel::Error)]
    #[case("DEBUG", LogLevel::Debug)]
    fn log_level_parses_valid_values(#[case] input: &str, #[case] expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().ok(), Some(expected));
    }

    #[test]
    fn log_level_rejects_invalid_values() {
        let result = "fatal".parse::<LogLevel>();
        assert!(result.unwrap_err().to_string().contains("unknown log level"));
    }

    #[test]
    fn log_level_as_filter_str_returns_correct_strings() {
        assert_eq!(LogLevel::Trace.as_filter_str(), "trace");
        assert_eq!(LogLevel::Warn.as_filter_str(), "warn");
        assert_eq!(LogLevel::Error.as_filter_str(), "error");
    }

    #[rstest]
    #[case("console", LogFormat::Console)]
    #[case("text", LogFormat::Text)]
    #[case("JSON", LogFormat::Json)]
    fn log_format_parses_valid_values(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(input.parse::<LogFormat>().ok(), Some(expected));
    }

    #[test]
    fn log_format_rejects_invalid_values() {
        let result = "yaml".parse::<LogFormat>();
        assert!(result.unwrap_err().to_string().contains("unknown log format"));
    }

    #[test]
    fn server_config_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn server_config_apply_overrides_updates_selected_fields() {
        let config =
            ServerConfig::default().apply_overrides(Some(LogLevel::Error), Some(LogFormat::Json));
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.log_format, LogFormat::Json);

        let config = ServerConfig::default().apply_overrides(None, None);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn server_config_with_log_level_builder() {
        let config = ServerConfig::default().with_log_level(LogLevel::Debug);
        assert_eq!(config.log_level, LogLevel::Debug);
    }
}

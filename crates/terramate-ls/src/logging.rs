//! Structured logging with environment variable configuration.
//!
//! This module initialises the logging subsystem for the language server.
//! Logs are written to stderr to avoid interfering with JSON-RPC communication
//! on stdout.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{LogFormat, ServerConfig};

fn filter_from_config(config: &ServerConfig) -> EnvFilter {
    EnvFilter::new(config.log_level.as_filter_str())
}

/// Initialise the logging subsystem based on configuration.
///
/// Sets up tracing with the specified log level and format. Logs are written
/// to stderr to avoid interfering with the JSON-RPC communication on stdout.
///
/// # Environment Variables
///
/// Precedence (highest to lowest):
///
/// 1. CLI `--log-level` / `--log-fmt`
/// 2. `TERRAMATE_LS_LOG_LEVEL` / `TERRAMATE_LS_LOG_FMT`
/// 3. Default configuration value
///
/// # Note
///
/// If a global subscriber is already set, this function silently ignores
/// the error. This is expected behaviour in tests or when multiple
/// components attempt to initialise logging.
pub fn init_logging(config: &ServerConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_from_config(config))
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    // The first subscriber wins; later calls (e.g. from tests) are no-ops.
    let _ = match config.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Console => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())
        }
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(false).finish())
        }
    };
}

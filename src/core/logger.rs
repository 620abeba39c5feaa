// Structured Logging for Station Coincidences
// tracing + tracing_subscriber, installed once per process

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::config::MonitoringConfig;

static INIT: Once = Once::new();

/// Map a configured level name onto a tracing level; unknown names fall back to INFO
pub fn parse_level(log_level: &str) -> Level {
    match log_level.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Setup structured logging for the entire application
pub fn setup_logging(log_level: Option<&str>, json_format: Option<bool>, console_output: Option<bool>) {
    let log_level_str = log_level.unwrap_or("INFO");
    let json_format = json_format.unwrap_or(false);
    let console_output = console_output.unwrap_or(true);
    let level = parse_level(log_level_str);

    INIT.call_once(|| {
        let filter = EnvFilter::from_default_env().add_directive(level.into());

        // try_init: a host application may already own the global subscriber
        let installed = if console_output && json_format {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_env_filter(filter)
                .try_init()
        } else if console_output {
            tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter(filter)
                .try_init()
        };

        if installed.is_ok() {
            tracing::info!(log_level = %log_level_str, json = json_format, "Logging initialized");
        }
    });
}

/// Setup logging from the monitoring section of the configuration
pub fn setup_logging_from_config(monitoring: &MonitoringConfig) {
    setup_logging(Some(&monitoring.log_level), Some(monitoring.json_format), Some(true));
}

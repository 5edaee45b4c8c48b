//! Centralized file-based logging system
//!
//! Writes logs to files under the configured directory, separated by log type:
//! - main/ - All application logs (JSON)
//! - error/ - Error and warning logs only
//! - request/ - Content endpoint logs
//! - admin/ - Admin endpoint and shutdown logs

use crate::infrastructure::config::LoggingConfig;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Per-type log subdirectories
pub const LOG_TYPES: [&str; 4] = ["main", "error", "request", "admin"];

/// Initialize logging
///
/// Console output is always on; file appenders are added when enabled.
/// Returns the WorkerGuards, which must be kept alive for the duration of the program.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<Vec<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if !config.file_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
            .init();
        return Ok(Vec::new());
    }

    create_log_dirs(&config.dir)?;

    let mut guards = Vec::new();

    // Main log - all logs
    let (main_appender, main_guard) = create_appender(&config.dir, "main");
    guards.push(main_guard);

    // Error log - ERROR and WARN only
    let (error_appender, error_guard) = create_appender(&config.dir, "error");
    guards.push(error_guard);

    let (request_appender, request_guard) = create_appender(&config.dir, "request");
    guards.push(request_guard);

    let (admin_appender, admin_guard) = create_appender(&config.dir, "admin");
    guards.push(admin_guard);

    let main_layer = tracing_subscriber::fmt::layer()
        .with_writer(main_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let request_layer = tracing_subscriber::fmt::layer()
        .with_writer(request_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target().contains("request")
        }));

    let admin_layer = tracing_subscriber::fmt::layer()
        .with_writer(admin_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target().contains("admin") || metadata.target().contains("shutdown")
        }));

    // Console layer for development
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(main_layer)
        .with(error_layer)
        .with(request_layer)
        .with(admin_layer)
        .with(console_layer)
        .init();

    tracing::info!(
        "Logging system initialized. Log files in {} directory",
        config.dir.display()
    );

    Ok(guards)
}

/// Create the log root and one subdirectory per log type
pub fn create_log_dirs(root: &Path) -> std::io::Result<()> {
    for log_type in &LOG_TYPES {
        fs::create_dir_all(root.join(log_type))?;
    }
    Ok(())
}

/// Create a daily rolling file appender
fn create_appender(root: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, root.join(name), name);
    tracing_appender::non_blocking(appender)
}

/// Log macro helpers for specific log types
#[macro_export]
macro_rules! log_request {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "request", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_admin {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "admin", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_main {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "main", $level, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_creation() {
        let test_dir = Path::new("logs_test");
        if test_dir.exists() {
            fs::remove_dir_all(test_dir).ok();
        }

        create_log_dirs(test_dir).unwrap();
        for log_type in &LOG_TYPES {
            assert!(test_dir.join(log_type).exists());
        }

        // Idempotent
        create_log_dirs(test_dir).unwrap();

        fs::remove_dir_all(test_dir).ok();
    }
}

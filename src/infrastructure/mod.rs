//! Infrastructure - ambient concerns
//!
//! This module contains everything that isn't serving content:
//! - Configuration management
//! - Logging
//! - Metrics

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig};
pub use metrics::{MetricsSnapshot, ServerMetrics};

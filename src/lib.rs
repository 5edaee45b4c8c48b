//! Joke server
//!
//! Hands out jokes and proverbs to concurrent clients, cycling each client
//! through every item of the active category in a shuffled, non-repeating
//! order. A separate admin endpoint flips the category or shuts down.

pub mod client;
pub mod core;
pub mod infrastructure;
pub mod server;

// Re-export commonly used types
pub use infrastructure::config::{Config, LoggingConfig, ServerConfig};
pub use server::{Role, Server, ServerContext};

use thiserror::Error;

/// Main error type for the joke server
#[derive(Error, Debug)]
pub enum JokeError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::infrastructure::config::ConfigError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::server::protocol::ProtocolError),

    #[error(transparent)]
    Cycle(#[from] crate::core::cycle::CycleError),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, JokeError>;

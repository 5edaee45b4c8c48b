//! Joke server binary
//!
//! Usage: `joke-server [secondary]`
//!
//! # Architecture
//! - **core**: catalog and per-client cycle table
//! - **server**: content and admin endpoints, shutdown coordination
//! - **infrastructure**: config, logging, metrics

use anyhow::Context;
use joke_server::infrastructure::logging::init_logging;
use joke_server::{Config, Role, Server};

/// Main application
pub struct JokeServerApp {
    config: Config,
    role: Role,
}

impl JokeServerApp {
    pub fn new(config: Config, role: Role) -> Self {
        Self { config, role }
    }

    /// Bind both endpoints and serve until shut down from the admin endpoint
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(role = ?self.role, "Starting joke server...");

        let server = Server::bind(&self.config.server, self.role)
            .await
            .context("binding listeners")?;
        server.run().await?;

        tracing::info!("Joke server exited");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    // Guards flush file appenders on drop; keep them for the whole run
    let _guards = init_logging(&config.logging).context("initializing logging")?;

    let role = Role::from_args(std::env::args().skip(1));
    JokeServerApp::new(config, role).run().await
}

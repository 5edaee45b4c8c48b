//! TCP server: content endpoint, admin endpoint, shutdown
//!
//! # Architecture
//! - **context**: shared state handed to every handler
//! - **protocol**: line parsing and reply formatting
//! - **request**: content endpoint handler
//! - **admin**: admin endpoint handler
//! - **listener**: accept loop with drain
//! - **shutdown**: phase machine that stops both accept loops

pub mod admin;
pub mod context;
pub mod listener;
pub mod protocol;
pub mod request;
pub mod shutdown;

pub use context::ServerContext;
pub use protocol::{AdminCommand, ProtocolError, RequestLine};
pub use shutdown::{ListenerKind, ShutdownCoordinator, ShutdownPhase};

use crate::core::CycleTable;
use crate::infrastructure::config::ServerConfig;
use crate::{log_main, JokeError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::Level;

/// Which instance of a primary/secondary pair this process is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Primary,
    Secondary,
}

impl Role {
    /// Prefix on every line a secondary instance sends
    pub const SECONDARY_MARKER: &'static str = "<S2>";

    /// Secondary iff the only argument is `secondary` (any case)
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(arg), None) if arg.as_ref().eq_ignore_ascii_case("secondary") => Role::Secondary,
            _ => Role::Primary,
        }
    }

    #[inline]
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Role::Primary => None,
            Role::Secondary => Some(Self::SECONDARY_MARKER),
        }
    }

    pub fn is_secondary(self) -> bool {
        self == Role::Secondary
    }
}

/// Both listeners bound and ready to serve
pub struct Server {
    ctx: Arc<ServerContext>,
    request_listener: TcpListener,
    admin_listener: TcpListener,
    request_addr: SocketAddr,
    admin_addr: SocketAddr,
    drain_timeout: Duration,
}

impl Server {
    /// Bind both endpoints for `role` from configuration
    pub async fn bind(config: &ServerConfig, role: Role) -> Result<Self> {
        let cycles = match config.seed {
            Some(seed) => CycleTable::seeded(seed),
            None => CycleTable::new(),
        };
        let ctx = Arc::new(ServerContext::new(role, cycles));
        Self::bind_with(
            &config.request_addr(role),
            &config.admin_addr(role),
            ctx,
            config.drain_timeout(),
        )
        .await
    }

    /// Bind explicit addresses around an existing context
    pub async fn bind_with(
        request_addr: &str,
        admin_addr: &str,
        ctx: Arc<ServerContext>,
        drain_timeout: Duration,
    ) -> Result<Self> {
        let request_listener = bind_listener(request_addr).await?;
        let admin_listener = bind_listener(admin_addr).await?;

        Ok(Self {
            request_addr: request_listener.local_addr()?,
            admin_addr: admin_listener.local_addr()?,
            ctx,
            request_listener,
            admin_listener,
            drain_timeout,
        })
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    pub fn request_addr(&self) -> SocketAddr {
        self.request_addr
    }

    pub fn admin_addr(&self) -> SocketAddr {
        self.admin_addr
    }

    /// Serve until both accept loops have stopped and drained
    pub async fn run(self) -> Result<()> {
        let role = self.ctx.role();
        log_main!(
            Level::INFO,
            ?role,
            request = %self.request_addr,
            admin = %self.admin_addr,
            "Joke server starting up"
        );
        if role.is_secondary() {
            log_main!(Level::INFO, "This is a secondary joke server");
        }

        let request = tokio::spawn(listener::serve(
            ListenerKind::Request,
            self.request_listener,
            Arc::clone(&self.ctx),
            self.drain_timeout,
            request::handle_connection,
        ));
        let admin = tokio::spawn(listener::serve(
            ListenerKind::Admin,
            self.admin_listener,
            Arc::clone(&self.ctx),
            self.drain_timeout,
            admin::handle_connection,
        ));

        let (request, admin) = tokio::join!(request, admin);
        request.map_err(|e| JokeError::Shutdown(format!("request listener task failed: {e}")))?;
        admin.map_err(|e| JokeError::Shutdown(format!("admin listener task failed: {e}")))?;

        let stats = self.ctx.metrics().snapshot();
        log_main!(
            Level::INFO,
            content_requests = stats.content_requests,
            departures = stats.departures,
            mode_toggles = stats.mode_toggles,
            completed_cycles = stats.completed_cycles,
            protocol_errors = stats.protocol_errors,
            connection_errors = stats.connection_errors,
            uptime_seconds = stats.uptime_seconds,
            "Joke server shut down"
        );
        Ok(())
    }
}

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| JokeError::Bind {
        addr: addr.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client;
    use crate::core::Category;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;
    use uuid::Uuid;

    const WAIT: Duration = Duration::from_secs(5);

    async fn start(role: Role) -> (SocketAddr, SocketAddr, Arc<ServerContext>, JoinHandle<Result<()>>) {
        let ctx = Arc::new(ServerContext::new(role, CycleTable::seeded(9)));
        let server = Server::bind_with("127.0.0.1:0", "127.0.0.1:0", ctx, Duration::from_secs(1))
            .await
            .unwrap();
        let (request, admin, ctx) = (server.request_addr(), server.admin_addr(), server.context());
        (request, admin, ctx, tokio::spawn(server.run()))
    }

    async fn stop(admin: SocketAddr, handle: JoinHandle<Result<()>>) {
        assert_eq!(client::send_admin(admin, "shutdown").await.unwrap(), None);
        tokio::time::timeout(WAIT, handle)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
    }

    fn label(reply: &str) -> &str {
        reply.split_whitespace().next().unwrap()
    }

    #[test]
    fn test_role_from_args() {
        assert_eq!(Role::from_args(Vec::<String>::new()), Role::Primary);
        assert_eq!(Role::from_args(["secondary"]), Role::Secondary);
        assert_eq!(Role::from_args(["SECONDARY"]), Role::Secondary);
        assert_eq!(Role::from_args(["primary"]), Role::Primary);
        assert_eq!(Role::from_args(["secondary", "extra"]), Role::Primary);
    }

    #[tokio::test]
    async fn test_fresh_client_cycles_through_jokes() {
        let (request, admin, _ctx, handle) = start(Role::Primary).await;
        let token = Uuid::new_v4();

        let mut labels = Vec::new();
        for _ in 0..4 {
            let reply = client::request_content(request, "alice", &token).await.unwrap();
            assert!(reply.contains("alice:"), "{reply}");
            labels.push(label(&reply).to_string());
        }
        labels.sort();
        assert_eq!(labels, ["JA", "JB", "JC", "JD"]);

        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_toggle_switches_later_requests() {
        let (request, admin, ctx, handle) = start(Role::Primary).await;
        let token = Uuid::new_v4();

        let reply = client::send_admin(admin, "").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Server running in proverb mode."));
        assert_eq!(ctx.active_category(), Category::Proverb);

        let reply = client::request_content(request, "bob", &token).await.unwrap();
        assert!(label(&reply).starts_with('P'), "{reply}");

        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_departure_resets_client() {
        let (request, admin, ctx, handle) = start(Role::Primary).await;
        let token = Uuid::new_v4();

        client::request_content(request, "carol", &token).await.unwrap();
        client::request_content(request, "carol", &token).await.unwrap();
        assert!(ctx.cycles().contains(token));

        let ack = client::send_departure(request, &token).await.unwrap();
        assert_eq!(ack, format!("ClientStatusTable for UUID {token} has been dropped, bye!"));
        assert!(!ctx.cycles().contains(token));

        client::request_content(request, "carol", &token).await.unwrap();
        let record = ctx.cycles().get(token).unwrap();
        assert_eq!(record.cycle(Category::Joke).remaining().len(), 3);
        assert_eq!(record.cycle(Category::Proverb).remaining().len(), 4);

        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_secondary_marks_every_reply() {
        let (request, admin, _ctx, handle) = start(Role::Secondary).await;
        let token = Uuid::new_v4();

        let reply = client::request_content(request, "dave", &token).await.unwrap();
        assert!(reply.starts_with("<S2> J"), "{reply}");

        let mode = client::send_admin(admin, "toggle").await.unwrap().unwrap();
        assert_eq!(mode, "<S2> Server running in proverb mode.");

        let ack = client::send_departure(request, &token).await.unwrap();
        assert!(ack.starts_with("<S2> "));

        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_primary_never_marks() {
        let (request, admin, _ctx, handle) = start(Role::Primary).await;
        let reply = client::request_content(request, "erin", &Uuid::new_v4()).await.unwrap();
        assert!(!reply.contains(Role::SECONDARY_MARKER));
        let mode = client::send_admin(admin, "x").await.unwrap().unwrap();
        assert!(!mode.contains(Role::SECONDARY_MARKER));
        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_connections() {
        let (request, admin, ctx, handle) = start(Role::Primary).await;

        stop(admin, handle).await;

        assert_eq!(ctx.shutdown().phase(), ShutdownPhase::AdminListenerStopped);
        assert!(TcpStream::connect(request).await.is_err());
        assert!(TcpStream::connect(admin).await.is_err());
    }

    #[tokio::test]
    async fn test_internal_stop_only_stops_request_listener() {
        let (request, admin, ctx, handle) = start(Role::Primary).await;

        client::send_internal_stop(request).await.unwrap();
        tokio::time::timeout(WAIT, ctx.shutdown().stopped(ListenerKind::Request))
            .await
            .unwrap();
        assert!(ctx.cycles().is_empty());

        // Admin endpoint still works
        let mode = client::send_admin(admin, "").await.unwrap();
        assert_eq!(mode.as_deref(), Some("Server running in proverb mode."));
        assert!(!handle.is_finished());

        stop(admin, handle).await;
        assert!(TcpStream::connect(request).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_token_gets_error_reply() {
        let (request, admin, ctx, handle) = start(Role::Primary).await;

        let reply = client::send_lines(request, &["frank", "not-a-uuid"]).await.unwrap().unwrap();
        assert!(reply.starts_with(protocol::ERROR_PREFIX), "{reply}");
        assert!(ctx.cycles().is_empty());

        // Peer that hangs up after the first line
        let mut stream = TcpStream::connect(request).await.unwrap();
        stream.write_all(b"frank\n").await.unwrap();
        stream.shutdown().await.unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with(protocol::ERROR_PREFIX), "{reply}");

        assert_eq!(ctx.metrics().snapshot().protocol_errors, 2);
        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_cycle() {
        let (request, admin, ctx, handle) = start(Role::Primary).await;
        let token = Uuid::new_v4();

        let tasks: Vec<_> = (0..20)
            .map(|_| tokio::spawn(async move { client::request_content(request, "gina", &token).await }))
            .collect();

        let mut counts = std::collections::HashMap::new();
        for task in tasks {
            let reply = task.await.unwrap().unwrap();
            *counts.entry(label(&reply).to_string()).or_insert(0) += 1;
        }

        // 20 draws = 5 complete runs of 4
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&n| n == 5), "{counts:?}");
        assert_eq!(ctx.cycles().len(), 1);

        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_concurrent_toggles() {
        let (_request, admin, ctx, handle) = start(Role::Primary).await;

        let tasks: Vec<_> = (0..10)
            .map(|_| tokio::spawn(async move { client::send_admin(admin, "").await }))
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(ctx.active_category(), Category::Joke);
        assert_eq!(ctx.metrics().snapshot().mode_toggles, 10);

        stop(admin, handle).await;
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let ctx = Arc::new(ServerContext::new(Role::Primary, CycleTable::seeded(0)));

        let err = Server::bind_with(&addr, "127.0.0.1:0", ctx, WAIT).await.err().unwrap();
        assert!(matches!(err, JokeError::Bind { .. }));
    }
}

//! Accept loop shared by both endpoints
//!
//! Spawns one task per connection into a `JoinSet`, exits when the
//! listener's stop phase is reached, then drains in-flight handlers.

use crate::server::context::ServerContext;
use crate::server::shutdown::ListenerKind;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};

/// Back-off after a failed accept
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Run the accept loop until `kind` is stopped
///
/// The listener socket is closed before draining, so new connections are
/// refused while in-flight handlers finish.
pub async fn serve<H, Fut>(
    kind: ListenerKind,
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    drain_timeout: Duration,
    handler: H,
) where
    H: Fn(TcpStream, SocketAddr, Arc<ServerContext>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut handlers: JoinSet<()> = JoinSet::new();

    while ctx.shutdown().is_running(kind) {
        tokio::select! {
            biased;

            _ = ctx.shutdown().stopped(kind) => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(target: "server", listener = %kind, %peer, "Accepted connection");
                    handlers.spawn(handler(stream, peer, Arc::clone(&ctx)));
                }
                Err(e) => {
                    ctx.metrics().record_connection_error();
                    tracing::warn!(target: "server", listener = %kind, error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },

            Some(finished) = handlers.join_next(), if !handlers.is_empty() => {
                log_handler_exit(kind, finished);
            }
        }
    }

    drop(listener);
    tracing::info!(target: "server", listener = %kind, "Listener stopped accepting");

    drain(kind, handlers, drain_timeout).await;
}

/// Wait for in-flight handlers, aborting whatever is left after `timeout`
async fn drain(kind: ListenerKind, mut handlers: JoinSet<()>, timeout: Duration) {
    if handlers.is_empty() {
        return;
    }

    tracing::info!(
        target: "server",
        listener = %kind,
        in_flight = handlers.len(),
        "Draining connection handlers"
    );

    let drained = tokio::time::timeout(timeout, async {
        while let Some(finished) = handlers.join_next().await {
            log_handler_exit(kind, finished);
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            target: "server",
            listener = %kind,
            remaining = handlers.len(),
            "Drain timed out, aborting remaining handlers"
        );
        handlers.abort_all();
    }
}

fn log_handler_exit(kind: ListenerKind, finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            tracing::error!(target: "server", listener = %kind, "Connection handler panicked");
        }
    }
}

//! Content endpoint handler
//!
//! One task per connection: read `identifier` and `token`, then either stop
//! the request listener, forget a departing client, or serve the client's
//! next item from the active category.

use crate::log_request;
use crate::server::context::ServerContext;
use crate::server::protocol::{self, RequestLine};
use crate::server::shutdown::ListenerKind;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::Level;
use uuid::Uuid;

/// Per-connection entry point spawned by the request listener
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) {
    if let Err(e) = serve_request(stream, &ctx).await {
        ctx.metrics().record_connection_error();
        log_request!(Level::WARN, %peer, error = %e, "Request connection failed");
    }
}

/// Handle one request on any byte stream
pub async fn serve_request<S>(stream: S, ctx: &ServerContext) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);

    let Some(identifier) = protocol::read_raw_line(&mut stream).await? else {
        log_request!(Level::DEBUG, "Peer closed before sending a request");
        return Ok(());
    };
    let token = protocol::read_raw_line(&mut stream).await?;

    let reply = match RequestLine::from_bytes(identifier, token) {
        Ok(RequestLine::InternalStop) => {
            log_request!(Level::INFO, "Internal stop signal received");
            ctx.shutdown().stop_listener(ListenerKind::Request);
            return Ok(());
        }
        Ok(RequestLine::Departure { token, sent }) => depart(ctx, token, &sent),
        Ok(RequestLine::Content { identifier, token }) => serve_content(ctx, &identifier, token),
        Err(e) => {
            ctx.metrics().record_protocol_error();
            log_request!(Level::WARN, error = %e, "Malformed request");
            protocol::error_reply(&e)
        }
    };

    protocol::write_line(&mut stream, &ctx.decorate(&reply)).await?;
    stream.shutdown().await
}

fn depart(ctx: &ServerContext, token: Uuid, sent: &str) -> String {
    let existed = ctx.cycles().remove(token);
    ctx.metrics().record_departure();
    log_request!(Level::INFO, %token, existed, "Client left, cycle state dropped");
    protocol::departure_reply(sent)
}

fn serve_content(ctx: &ServerContext, identifier: &str, token: Uuid) -> String {
    let category = ctx.active_category();
    log_request!(Level::INFO, user = identifier, %token, %category, "Request received");

    let draw = ctx.cycles().next_index(token, category);
    if draw.first_contact {
        log_request!(Level::DEBUG, %token, "New client registered");
    }

    let item = ctx.store().item(category, draw.index);
    let reply = protocol::content_reply(item, identifier);
    ctx.metrics().record_content_request();
    log_request!(Level::INFO, user = identifier, %token, reply = %reply, "Sending reply");

    if draw.cycle_complete {
        ctx.metrics().record_completed_cycle();
        log_request!(
            Level::INFO,
            %token,
            %category,
            "Finished a four-item cycle, order re-randomized"
        );
    }

    reply
}

//! Admin endpoint handler
//!
//! Reads one line: `shutdown` stops both listeners, anything else flips the
//! active category and reports the new mode.

use crate::log_admin;
use crate::server::context::ServerContext;
use crate::server::protocol::{self, AdminCommand};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::Level;

pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) {
    if let Err(e) = serve_admin(stream, &ctx).await {
        ctx.metrics().record_connection_error();
        log_admin!(Level::WARN, %peer, error = %e, "Admin connection failed");
    }
}

pub async fn serve_admin<S>(stream: S, ctx: &ServerContext) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);

    let Some(line) = protocol::read_line(&mut stream).await? else {
        log_admin!(Level::DEBUG, "Admin peer closed without a command");
        return Ok(());
    };

    match AdminCommand::parse(&line) {
        AdminCommand::Shutdown => {
            if !ctx.shutdown().shutdown() {
                log_admin!(Level::DEBUG, "Repeated shutdown command ignored");
            }
            Ok(())
        }
        AdminCommand::Toggle => {
            let mode = ctx.toggle_category();
            ctx.metrics().record_mode_toggle();
            let reply = protocol::mode_reply(mode);
            log_admin!(Level::INFO, %mode, "{}", reply);

            protocol::write_line(&mut stream, &ctx.decorate(&reply)).await?;
            stream.shutdown().await
        }
    }
}

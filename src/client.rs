//! Protocol drivers for both endpoints
//!
//! Each call opens one connection, writes its lines, and reads the
//! optional one-line reply.

use crate::server::protocol::{self, ProtocolError};
use crate::Result;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use uuid::Uuid;

/// Send raw lines and return the reply line, if the server sent one
pub async fn send_lines<A: ToSocketAddrs>(addr: A, lines: &[&str]) -> Result<Option<String>> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    let mut stream = BufReader::new(stream);

    let mut request = String::new();
    for line in lines {
        request.push_str(line);
        request.push('\n');
    }
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    Ok(protocol::read_line(&mut stream).await?)
}

/// Ask for the next item as `identifier`
pub async fn request_content<A: ToSocketAddrs>(
    addr: A,
    identifier: &str,
    token: &Uuid,
) -> Result<String> {
    let token = token.to_string();
    send_lines(addr, &[identifier, &token])
        .await?
        .ok_or_else(|| ProtocolError::MissingReply.into())
}

/// Tell the server to forget `token`
pub async fn send_departure<A: ToSocketAddrs>(addr: A, token: &Uuid) -> Result<String> {
    let token = token.to_string();
    send_lines(addr, &["", &token])
        .await?
        .ok_or_else(|| ProtocolError::MissingReply.into())
}

/// Two blank lines: stops the request listener, no reply
pub async fn send_internal_stop<A: ToSocketAddrs>(addr: A) -> Result<()> {
    send_lines(addr, &["", ""]).await?;
    Ok(())
}

/// One admin line; `None` back for `shutdown`
pub async fn send_admin<A: ToSocketAddrs>(addr: A, line: &str) -> Result<Option<String>> {
    send_lines(addr, &[line]).await
}

//! Line protocol for both endpoints
//!
//! Content endpoint: two lines in (`identifier`, `token`), zero or one line out.
//! Admin endpoint: one line in, zero or one line out.

use crate::core::{Category, ContentItem};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Admin line that triggers shutdown (case-insensitive)
pub const SHUTDOWN_COMMAND: &str = "shutdown";

/// Prefix for error replies
pub const ERROR_PREFIX: &str = "ERROR:";

/// Longest accepted line, terminator excluded
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Parsed content-endpoint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestLine {
    /// Both lines empty: stop the request listener
    InternalStop,
    /// Empty identifier, non-empty token: forget this client.
    /// `sent` is the token line as received, echoed in the acknowledgement.
    Departure { token: Uuid, sent: String },
    /// Regular request for the next item
    Content { identifier: String, token: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid client token {token:?}: {reason}")]
    InvalidToken { token: String, reason: String },
    #[error("connection closed before the client token was sent")]
    MissingToken,
    #[error("request line is not valid UTF-8")]
    InvalidEncoding,
    #[error("connection closed without a reply")]
    MissingReply,
}

impl RequestLine {
    /// Classify a request
    ///
    /// The internal stop and departure signals both start with an empty
    /// identifier; only an empty token makes it a stop, and the token is
    /// never parsed in that case.
    pub fn parse(identifier: &str, token: Option<&str>) -> Result<Self, ProtocolError> {
        let token = token.ok_or(ProtocolError::MissingToken)?;

        if identifier.is_empty() && token.is_empty() {
            return Ok(RequestLine::InternalStop);
        }

        let parsed = Uuid::parse_str(token.trim()).map_err(|e| ProtocolError::InvalidToken {
            token: token.to_string(),
            reason: e.to_string(),
        })?;

        if identifier.is_empty() {
            Ok(RequestLine::Departure {
                token: parsed,
                sent: token.to_string(),
            })
        } else {
            Ok(RequestLine::Content {
                identifier: identifier.to_string(),
                token: parsed,
            })
        }
    }

    /// Decode raw request lines, then classify them
    ///
    /// Lines that are not UTF-8 are rejected.
    pub fn from_bytes(identifier: Vec<u8>, token: Option<Vec<u8>>) -> Result<Self, ProtocolError> {
        let identifier = decode_line(identifier)?;
        let token = token.map(decode_line).transpose()?;
        Self::parse(&identifier, token.as_deref())
    }
}

/// Parsed admin command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Shutdown,
    /// Anything else, including an empty line
    Toggle,
}

impl AdminCommand {
    pub fn parse(line: &str) -> Self {
        if line.trim().eq_ignore_ascii_case(SHUTDOWN_COMMAND) {
            AdminCommand::Shutdown
        } else {
            AdminCommand::Toggle
        }
    }
}

pub fn content_reply(item: &ContentItem, identifier: &str) -> String {
    format!("{} {}: {}", item.label, identifier, item.text)
}

pub fn departure_reply(token: &str) -> String {
    format!("ClientStatusTable for UUID {} has been dropped, bye!", token)
}

pub fn mode_reply(category: Category) -> String {
    format!("Server running in {} mode.", category)
}

pub fn error_reply(err: &ProtocolError) -> String {
    format!("{} {}", ERROR_PREFIX, err)
}

/// Read one line of raw bytes without its terminator. `None` on EOF.
///
/// Fails with `InvalidData` once more than `MAX_LINE_LEN` bytes arrive
/// without a newline.
pub async fn read_raw_line<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut limited = (&mut *reader).take(MAX_LINE_LEN as u64 + 1);
    if limited.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }
    if line.len() > MAX_LINE_LEN && line.last() != Some(&b'\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {MAX_LINE_LEN} bytes"),
        ));
    }
    while matches!(line.last().copied(), Some(b'\r' | b'\n')) {
        line.pop();
    }
    Ok(Some(line))
}

/// Read one line, replacing invalid UTF-8 sequences. `None` on EOF.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_raw_line(reader).await?;
    Ok(line.map(|raw| String::from_utf8_lossy(&raw).into_owned()))
}

fn decode_line(raw: Vec<u8>) -> Result<String, ProtocolError> {
    String::from_utf8(raw).map_err(|_| ProtocolError::InvalidEncoding)
}

/// Write one line and flush
pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

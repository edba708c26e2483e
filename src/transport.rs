//! Frame transport: owns one TCP connection to one server.
//!
//! Frames on the wire are a 4-byte big-endian length prefix (not counting itself)
//! followed by that many bytes of body. The transport only knows about framing; it
//! does not interpret the body.

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// The largest frame the transport will accept before declaring the peer
/// misbehaving; well above any legitimate znode payload.
const MAX_FRAME_LEN: i32 = 16 * 1024 * 1024;

/// A connected, framed duplex byte stream to a single server.
///
/// Owned exclusively by the session reactor task: `send`/`recv` are `&mut self` so
/// the type system enforces the "one writer, one reader, both on the reactor" rule
/// rather than requiring an internal lock.
pub struct Transport {
    stream: TcpStream,
    peer: Endpoint,
}

impl Transport {
    /// Opens a TCP connection to `endpoint`. Disables Nagle's algorithm since every
    /// frame here is already a complete logical message.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(peer = %endpoint, "transport connected");
        Ok(Self { stream, peer: endpoint.clone() })
    }

    /// Writes one length-prefixed frame. Safe to call only from the owning task.
    pub async fn send(&mut self, body: &[u8]) -> Result<()> {
        if body.len() > MAX_FRAME_LEN as usize {
            return Err(Error::InvalidLength(body.len() as i32));
        }
        let len = body.len() as i32;
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(body).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads one length-prefixed frame, returning its body.
    ///
    /// On any I/O error (including a clean peer shutdown, surfaced as an
    /// `UnexpectedEof`) the transport should be considered closed; the caller is
    /// expected to drop this `Transport` and reconnect.
    pub async fn recv(&mut self) -> Result<BytesMut> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).await?;
        let len = i32::from_be_bytes(len_buf);
        if !(0..=MAX_FRAME_LEN).contains(&len) {
            return Err(Error::InvalidLength(len));
        }
        let mut body = BytesMut::zeroed(len as usize);
        self.stream.read_exact(&mut body).await?;
        Ok(body)
    }

    pub fn peer(&self) -> &Endpoint {
        &self.peer
    }
}

//! Length-prefixed message framing over a byte stream
//!
//! Every message is a little-endian `u32` length followed by the payload.
//! Reads go through an internal buffer, so dropping a pending `recv` (on a
//! timeout) never loses or splits a frame.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::protocol::MAX_PAYLOAD_BYTES;

const LEN_PREFIX: usize = 4;

/// One end of the session stream
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    remote: String,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(stream: S, remote: impl Into<String>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(MAX_PAYLOAD_BYTES + LEN_PREFIX),
            remote: remote.into(),
        }
    }

    /// Address (or label) of the other side
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Write one framed message
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), ConnectionError> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(ConnectionError::Oversized(payload.len()));
        }
        let mut frame = BytesMut::with_capacity(LEN_PREFIX + payload.len());
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(payload);

        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read the next framed message. Cancel-safe.
    pub async fn recv(&mut self) -> Result<Bytes, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(frame);
            }
            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(ConnectionError::Closed);
            }
        }
    }

    /// Read the next message, giving up after `limit`. `Ok(None)` means the
    /// limit passed; no limit waits indefinitely.
    pub async fn recv_timeout(
        &mut self,
        limit: Option<Duration>,
    ) -> Result<Option<Bytes>, ConnectionError> {
        match limit {
            None => self.recv().await.map(Some),
            Some(limit) => match tokio::time::timeout(limit, self.recv()).await {
                Ok(result) => result.map(Some),
                Err(_) => Ok(None),
            },
        }
    }

    /// Close the write half. Failures are logged, never raised.
    pub async fn shutdown(mut self) {
        match self.stream.shutdown().await {
            Ok(()) => info!(remote = %self.remote, "Connection closed"),
            Err(e) => warn!(remote = %self.remote, error = %e, "Failed to close connection"),
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Bytes>, ConnectionError> {
        if self.buffer.len() < LEN_PREFIX {
            return Ok(None);
        }
        let mut prefix = [0u8; LEN_PREFIX];
        prefix.copy_from_slice(&self.buffer[..LEN_PREFIX]);
        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_PAYLOAD_BYTES {
            return Err(ConnectionError::Oversized(len));
        }
        if self.buffer.len() < LEN_PREFIX + len {
            self.buffer.reserve(LEN_PREFIX + len - self.buffer.len());
            return Ok(None);
        }
        self.buffer.advance(LEN_PREFIX);
        Ok(Some(self.buffer.split_to(len).freeze()))
    }
}

/// Bind the host's listening socket on all interfaces
pub async fn listen(port: u16) -> Result<TcpListener, ConnectionError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ConnectionError::Bind { addr, source })?;
    info!(%addr, "Listening for a peer");
    Ok(listener)
}

/// Wait for the one peer of this session. Failed accepts are logged and
/// listening continues.
pub async fn accept_peer(listener: &TcpListener) -> Connection<TcpStream> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(error = %e, "Failed to set TCP_NODELAY");
                }
                info!(remote = %addr, "Peer connected");
                return Connection::new(stream, addr.to_string());
            }
            Err(e) => warn!(error = %e, "Failed to accept connection"),
        }
    }
}

/// Connect to a host
pub async fn connect(addr: SocketAddr) -> Result<Connection<TcpStream>, ConnectionError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ConnectionError::Connect { addr, source })?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "Failed to set TCP_NODELAY");
    }
    info!(remote = %addr, "Connected to host");
    Ok(Connection::new(stream, addr.to_string()))
}

/// Stream-level errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Host not found at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed by remote")]
    Closed,

    #[error("Frame of {0} bytes exceeds the payload limit")]
    Oversized(usize),

    #[error("No message from remote for {0} consecutive ticks")]
    Stalled(u32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn send_writes_length_prefix() {
        let mock = Builder::new().write(&framed(b"start")).build();
        let mut conn = Connection::new(mock, "mock");
        conn.send(b"start").await.unwrap();
    }

    #[tokio::test]
    async fn recv_reassembles_split_frames() {
        let bytes = [framed(b"hello"), framed(b"world")].concat();
        let mock = Builder::new()
            .read(&bytes[..2])
            .read(&bytes[2..7])
            .read(&bytes[7..])
            .build();
        let mut conn = Connection::new(mock, "mock");
        assert_eq!(&conn.recv().await.unwrap()[..], b"hello");
        assert_eq!(&conn.recv().await.unwrap()[..], b"world");
        assert!(matches!(conn.recv().await, Err(ConnectionError::Closed)));
    }

    #[tokio::test]
    async fn zero_length_frame_is_delivered_empty() {
        let mock = Builder::new().read(&framed(b"")).build();
        let mut conn = Connection::new(mock, "mock");
        assert!(conn.recv().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_prefix_is_rejected() {
        let prefix = ((MAX_PAYLOAD_BYTES + 1) as u32).to_le_bytes();
        let mock = Builder::new().read(&prefix).build();
        let mut conn = Connection::new(mock, "mock");
        assert!(matches!(
            conn.recv().await,
            Err(ConnectionError::Oversized(n)) if n == MAX_PAYLOAD_BYTES + 1
        ));
    }

    #[tokio::test]
    async fn oversized_send_is_rejected_before_writing() {
        let mock = Builder::new().build();
        let mut conn = Connection::new(mock, "mock");
        let payload = vec![b'x'; MAX_PAYLOAD_BYTES + 1];
        assert!(matches!(
            conn.send(&payload).await,
            Err(ConnectionError::Oversized(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_recv_keeps_partial_frame() {
        let (near, mut far) = tokio::io::duplex(64);
        let mut conn = Connection::new(near, "duplex");
        let bytes = framed(b"frame");

        far.write_all(&bytes[..6]).await.unwrap();
        let waited = conn
            .recv_timeout(Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(waited.is_none());

        far.write_all(&bytes[6..]).await.unwrap();
        let frame = conn
            .recv_timeout(Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(frame.as_deref(), Some(&b"frame"[..]));
    }

    #[tokio::test]
    async fn loopback_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (host, peer) = tokio::join!(accept_peer(&listener), connect(addr));
        let mut host = host;
        let mut peer = peer.unwrap();

        host.send(b"s").await.unwrap();
        assert_eq!(&peer.recv().await.unwrap()[..], b"s");
        peer.send(b"ack").await.unwrap();
        assert_eq!(&host.recv().await.unwrap()[..], b"ack");

        peer.shutdown().await;
        assert!(matches!(host.recv().await, Err(ConnectionError::Closed)));
    }

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(matches!(
            connect(addr).await,
            Err(ConnectionError::Connect { .. })
        ));
    }
}

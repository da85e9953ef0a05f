use super::{resp, Command, Reply, Transport, TransportError};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Initial capacity of the read and write buffers.
const BUFFER_CAPACITY: usize = 64 * 1024;

/// RESP transport over a single TCP connection.
///
/// Commands accumulate in `write_buf` until [`Transport::flush`] hands the
/// whole batch to the socket with one write. Replies are parsed
/// incrementally out of `read_buf`, so one socket read can satisfy many
/// `receive` calls.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    write_buf: BytesMut,
    read_buf: BytesMut,
}

impl TcpTransport {
    /// Connect to `addr` and configure the socket for low latency.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        debug!("Connecting TCP transport to: {}", addr);
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        debug!("TCP transport connected to: {}", peer);

        Ok(Self {
            stream,
            peer,
            write_buf: BytesMut::with_capacity(BUFFER_CAPACITY),
            read_buf: BytesMut::with_capacity(BUFFER_CAPACITY),
        })
    }

    /// Bytes encoded but not yet written to the socket.
    pub fn buffered_len(&self) -> usize {
        self.write_buf.len()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        resp::encode_command(command, &mut self.write_buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        trace!("Writing {} bytes to {}", self.buffered_len(), self.peer);
        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;
        self.write_buf.clear();
        Ok(())
    }

    async fn receive(&mut self) -> Result<Reply, TransportError> {
        loop {
            if let Some((reply, used)) = resp::parse_reply(&self.read_buf)? {
                self.read_buf.advance(used);
                return Ok(reply);
            }

            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        debug!("Closing TCP transport to: {}", self.peer);
        self.stream.shutdown().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "TCP"
    }
}

//! TCP transport for the tokio [`Client`](crate::client::Client).
//!
//! Resolves the server name, tries each address in turn under a timeout
//! and enables TCP keepalive on the socket it ends up with. Reads and
//! writes are plain byte operations; framing lives in
//! [`LineCodec`](crate::line::LineCodec).

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::SessionError;

/// A connected server socket.
#[derive(Debug)]
pub struct Transport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Transport {
    /// Resolve `host` and connect to the first address that accepts.
    ///
    /// Each attempt is bounded by `connect_timeout`. If every address timed
    /// out the error is [`SessionError::ConnectTimeout`], otherwise
    /// [`SessionError::Unreachable`].
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Transport, SessionError> {
        let addrs: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|source| SessionError::Resolve {
                host: host.to_owned(),
                source,
            })?
            .collect();

        let mut timed_out = 0;
        for addr in &addrs {
            debug!(%addr, "trying address");
            match timeout(connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    info!(%addr, "connected");
                    return Ok(Transport::tcp(stream, *addr));
                }
                Ok(Err(err)) => warn!(%addr, %err, "connect failed"),
                Err(_) => {
                    warn!(%addr, "connect timed out");
                    timed_out += 1;
                }
            }
        }

        if !addrs.is_empty() && timed_out == addrs.len() {
            Err(SessionError::ConnectTimeout(connect_timeout))
        } else {
            Err(SessionError::Unreachable {
                host: host.to_owned(),
                port,
            })
        }
    }

    /// Wrap an already connected stream.
    pub fn tcp(stream: TcpStream, peer: SocketAddr) -> Transport {
        if let Err(err) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", err);
        }
        Transport { stream, peer }
    }

    /// The server address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Read into `buf`; `Ok(0)` means the server closed the connection.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).await
    }

    /// Write all of `bytes`.
    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await
    }

    /// Close the write half.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

use crate::addr::{Network, host_and_port};
use crate::error::{NetError, Result};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use strand_event::Cancel;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Bidirectional connection handed out by [`dial`].
///
/// Protocol layers only rely on this contract, so
/// that they can be driven by an in-memory stream
/// as well as by a socket.
pub trait Conn: AsyncRead + AsyncWrite + Send + Unpin {
    fn local_addr(&self) -> io::Result<SocketAddr>;
    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

/// Connection over a TCP stream.
#[derive(Debug)]
pub struct TcpConn {
    stream: TcpStream,
}

impl TcpConn {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Split into halves owned by the read loop and
    /// the write path respectively.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

impl Conn for TcpConn {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl AsyncRead for TcpConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpConn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// Connect to `address` on the named network.
///
/// The network kind and the address are validated
/// before anything touches the network. The attempt
/// is abandoned with [`NetError::Cancelled`] when
/// `cancel` fires first.
pub async fn dial(network: &str, address: &str, cancel: &Cancel) -> Result<TcpConn> {
    let network = Network::parse(network)?;
    let (host, port) = host_and_port(address)?;
    tracing::debug!(%network, address, "dialing");
    let stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(NetError::Cancelled),
        stream = TcpStream::connect((host, port)) => stream?,
    };
    tracing::debug!(%network, address, "connected");
    Ok(TcpConn::new(stream))
}

/// Like [`dial`], but gives up with [`NetError::Timeout`]
/// once `timeout` has elapsed.
pub async fn dial_timeout(
    network: &str,
    address: &str,
    timeout: Duration,
    cancel: &Cancel,
) -> Result<TcpConn> {
    match tokio::time::timeout(timeout, dial(network, address, cancel)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(network, address, ?timeout, "dial timed out");
            Err(NetError::Timeout(timeout))
        }
    }
}

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Transport a peer runs on: a real TCP socket, or an in-memory pipe that
/// takes the place of the remote node in tests.
pub enum Bearer {
    Tcp(TcpStream),
    Duplex(DuplexStream),
}

impl Bearer {
    pub async fn connect_tcp(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::Tcp(stream))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Bearer::Tcp(stream) => stream.local_addr().ok(),
            Bearer::Duplex(_) => None,
        }
    }
}

impl AsyncRead for Bearer {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Bearer::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Bearer::Duplex(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Bearer {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Bearer::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Bearer::Duplex(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Bearer::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Bearer::Duplex(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Bearer::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Bearer::Duplex(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

//! TCP transport implementation

use crate::stream::{StreamAccessor, TransportLayer};
use crate::{ElgasError, ElgasResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub peer_address: SocketAddr,
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create TCP settings with timeout
    pub fn with_timeout(peer_address: SocketAddr, timeout: Option<Duration>) -> Self {
        Self {
            peer_address,
            timeout,
        }
    }
}

/// TCP transport over a socket accepted from a dialing device
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create TCP transport from an already-connected TcpStream
    ///
    /// # Arguments
    /// * `stream` - The accepted TCP stream
    /// * `timeout` - Optional read/write timeout
    pub fn from_connected_stream(
        stream: TcpStream,
        timeout: Option<Duration>,
    ) -> ElgasResult<Self> {
        let peer_address = stream.peer_addr()?;
        Ok(Self {
            stream: Some(stream),
            settings: TcpSettings::with_timeout(peer_address, timeout),
            closed: false,
        })
    }

    /// Get transport settings
    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }

    fn stream_mut(&mut self) -> ElgasResult<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(|| {
            ElgasError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "TCP stream not connected",
            ))
        })
    }
}

impl TransportLayer for TcpTransport {
    fn peer_address(&self) -> SocketAddr {
        self.settings.peer_address
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> ElgasResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> ElgasResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| ElgasError::Timeout)?
                .map_err(ElgasError::Connection)
        } else {
            stream.read(buf).await.map_err(ElgasError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> ElgasResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| ElgasError::Timeout)?
                .map_err(ElgasError::Connection)
        } else {
            stream.write(buf).await.map_err(ElgasError::Connection)
        }
    }

    async fn flush(&mut self) -> ElgasResult<()> {
        self.stream_mut()?.flush().await.map_err(ElgasError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> ElgasResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = TcpStream::connect(addr).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        let transport =
            TcpTransport::from_connected_stream(accepted, Some(Duration::from_secs(5))).unwrap();
        (transport, peer)
    }

    #[tokio::test]
    async fn test_tcp_settings() {
        let (transport, peer) = connected_pair().await;
        let settings = transport.settings();
        assert_eq!(settings.peer_address, peer.local_addr().unwrap());
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_read_write_roundtrip() {
        let (mut transport, mut peer) = connected_pair().await;
        assert_eq!(transport.peer_address(), peer.local_addr().unwrap());

        peer.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        transport.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        transport.write_all(b"world").await.unwrap();
        transport.flush().await.unwrap();
        let mut buf = [0u8; 5];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"world");
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (mut transport, _peer) = connected_pair().await;
        transport
            .set_timeout(Some(Duration::from_millis(20)))
            .await
            .unwrap();
        let mut buf = [0u8; 1];
        assert!(matches!(transport.read(&mut buf).await, Err(ElgasError::Timeout)));
    }

    #[tokio::test]
    async fn test_close_is_observed_by_peer() {
        let (mut transport, mut peer) = connected_pair().await;
        transport.close().await.unwrap();
        assert!(transport.is_closed());

        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
        assert!(transport.read(&mut buf).await.is_err());
    }
}

//! Stream accessor trait for transport layer

use crate::{ElgasError, ElgasResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;

/// Stream accessor interface to access a physical stream to a remote device
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Set the read/write timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> ElgasResult<()>;

    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> ElgasResult<usize>;

    /// Read exact number of bytes from the stream
    ///
    /// # Returns
    ///
    /// Returns error if unable to read the exact number of bytes
    async fn read_exact(&mut self, mut buf: &mut [u8]) -> ElgasResult<()> {
        while !buf.is_empty() {
            let n = self.read(buf).await?;
            if n == 0 {
                return Err(ElgasError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Failed to read exact number of bytes",
                )));
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Write data to the stream
    ///
    /// # Returns
    ///
    /// Number of bytes written
    async fn write(&mut self, buf: &[u8]) -> ElgasResult<usize>;

    /// Write all data to the stream
    async fn write_all(&mut self, buf: &[u8]) -> ElgasResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(ElgasError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> ElgasResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Shut down both directions and close the stream
    async fn close(&mut self) -> ElgasResult<()>;
}

/// Transport layer trait that extends StreamAccessor
///
/// A transport is always bound to one remote peer for its whole lifetime.
pub trait TransportLayer: StreamAccessor {
    /// Address of the remote peer
    fn peer_address(&self) -> SocketAddr;
}

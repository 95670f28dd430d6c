//! Frame reader
//!
//! Collects bytes from a stream until a complete escaped frame (STX ... ETX)
//! is available. Escaping guarantees ETX never occurs inside a frame, so the
//! first ETX after STX terminates it.

use crate::frame::{ETX, STX};
use bytes::{Buf, BytesMut};
use elgas_core::{ElgasError, ElgasResult};
use elgas_transport::StreamAccessor;

const READ_CHUNK: usize = 1024;

/// Incremental reader for escaped frames
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
    max_frame_length: usize,
}

impl FrameReader {
    /// Create a reader that rejects frames longer than `max_frame_length`
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(READ_CHUNK),
            max_frame_length,
        }
    }

    /// Change the frame size limit, keeping buffered bytes
    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Read the next escaped frame, STX and ETX included
    ///
    /// Bytes before STX are discarded. Bytes read past ETX stay buffered for
    /// the next call.
    ///
    /// # Errors
    /// Returns `FrameInvalid` if the frame exceeds the maximum length and a
    /// `Connection` error if the peer closes the stream mid-frame.
    pub async fn next_frame<S: StreamAccessor + ?Sized>(
        &mut self,
        stream: &mut S,
    ) -> ElgasResult<Vec<u8>> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(ElgasError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Connection closed before a complete frame was received",
                )));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn take_frame(&mut self) -> ElgasResult<Option<Vec<u8>>> {
        match self.buffer.iter().position(|&b| b == STX) {
            Some(start) => self.buffer.advance(start),
            None => {
                self.buffer.clear();
                return Ok(None);
            }
        }

        match self.buffer.iter().position(|&b| b == ETX) {
            Some(end) if end + 1 > self.max_frame_length => Err(ElgasError::FrameInvalid(format!(
                "Frame of {} bytes exceeds maximum of {}",
                end + 1,
                self.max_frame_length
            ))),
            Some(end) => Ok(Some(self.buffer.split_to(end + 1).to_vec())),
            None if self.buffer.len() > self.max_frame_length => {
                Err(ElgasError::FrameInvalid(format!(
                    "No frame end within {} bytes",
                    self.max_frame_length
                )))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elgas_transport::TcpTransport;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let peer = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        (
            TcpTransport::from_connected_stream(accepted, Some(Duration::from_secs(5))).unwrap(),
            peer,
        )
    }

    #[tokio::test]
    async fn test_reads_frames_split_across_writes() {
        let (mut transport, mut peer) = connected_pair().await;
        let mut reader = FrameReader::new(64);

        let writer = tokio::spawn(async move {
            peer.write_all(&[0xFF, STX, 0x01]).await.unwrap();
            peer.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            peer.write_all(&[0x03, ETX, STX, 0x05, ETX]).await.unwrap();
            peer
        });

        let first = reader.next_frame(&mut transport).await.unwrap();
        assert_eq!(first, vec![STX, 0x01, 0x03, ETX]);
        let second = reader.next_frame(&mut transport).await.unwrap();
        assert_eq!(second, vec![STX, 0x05, ETX]);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_oversized_frame() {
        let (mut transport, mut peer) = connected_pair().await;
        let mut reader = FrameReader::new(4);
        peer.write_all(&[STX, 1, 2, 3, 4, 5, ETX]).await.unwrap();
        assert!(matches!(
            reader.next_frame(&mut transport).await,
            Err(ElgasError::FrameInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_eof_mid_frame() {
        let (mut transport, mut peer) = connected_pair().await;
        let mut reader = FrameReader::new(64);
        peer.write_all(&[STX, 1, 2]).await.unwrap();
        drop(peer);
        assert!(matches!(
            reader.next_frame(&mut transport).await,
            Err(ElgasError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_raised_limit_keeps_buffered_bytes() {
        let (mut transport, mut peer) = connected_pair().await;
        let mut reader = FrameReader::new(4);
        peer.write_all(&[STX, 0x01, ETX, STX, 1, 2, 3, 4, 5, ETX]).await.unwrap();

        let first = reader.next_frame(&mut transport).await.unwrap();
        assert_eq!(first, vec![STX, 0x01, ETX]);

        let mut reader = reader.with_max_frame_length(64);
        drop(peer);
        let second = reader.next_frame(&mut transport).await.unwrap();
        assert_eq!(second, vec![STX, 1, 2, 3, 4, 5, ETX]);
    }
}

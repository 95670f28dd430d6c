//! ELGAS2 client over an accepted connection
//!
//! After a device has called in and been acknowledged, the gateway becomes
//! the client on the very same socket. Every request is a sealed APDU inside
//! an envelope addressed back to the device; the device answers with a
//! sealed response using the same service number.

use crate::apdu::{ArchiveRequest, ArchiveResponse, ArchiveStart, STATUS_OK};
use crate::session::{ArchivePage, DeviceSession};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use elgas_core::{Archive, ElgasError, ElgasResult, ServiceNumber};
use elgas_security::{ApduCipher, Credentials};
use elgas_session::{
    Addressing, DEFAULT_GROUP, ElgasFrameCodec, Envelope, FrameCodec, FrameReader,
};
use elgas_transport::TransportLayer;
use std::fmt;

/// Largest escaped response frame accepted from a device
pub const MAX_RESPONSE_FRAME: usize = 16 * 1024;

/// Client state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Created, `connect` not called yet
    Created,
    /// Ready for requests
    Connected,
    /// Closed
    Closed,
}

/// ELGAS2 client bound to one device connection
pub struct ElgasClient<T: TransportLayer> {
    transport: T,
    credentials: Credentials,
    cipher: ApduCipher,
    codec: ElgasFrameCodec,
    /// Addressing of outbound frames (gateway -> device)
    addressing: Addressing,
    group: u8,
    reader: FrameReader,
    state: ClientState,
}

impl<T: TransportLayer> ElgasClient<T> {
    /// Create a client
    ///
    /// # Arguments
    /// * `transport` - Transport to the device, already connected
    /// * `credentials` - Password and encryption key of the device
    /// * `addressing` - Addressing for frames sent to the device
    pub fn new(transport: T, credentials: Credentials, addressing: Addressing) -> Self {
        let cipher = ApduCipher::new(&credentials);
        Self {
            transport,
            credentials,
            cipher,
            codec: ElgasFrameCodec,
            addressing,
            group: DEFAULT_GROUP,
            reader: FrameReader::new(MAX_RESPONSE_FRAME),
            state: ClientState::Created,
        }
    }

    /// Service group of outbound frames
    pub fn with_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    /// Continue with a reader that has already been used on this connection
    ///
    /// Bytes it buffered past the last frame are the start of the first
    /// response.
    pub fn with_reader(mut self, reader: FrameReader) -> Self {
        self.reader = reader.with_max_frame_length(MAX_RESPONSE_FRAME);
        self
    }

    /// Make the client ready for requests
    ///
    /// The device is already on the line, so there is no transport to open
    /// and no handshake: credentials travel with every sealed request.
    pub async fn connect(&mut self) -> ElgasResult<()> {
        match self.state {
            ClientState::Created => {
                if self.transport.is_closed() {
                    return Err(ElgasError::Connection(std::io::Error::new(
                        std::io::ErrorKind::NotConnected,
                        "Device connection is closed",
                    )));
                }
                self.state = ClientState::Connected;
                log::debug!("ELGAS client ready for {}", self.transport.peer_address());
                Ok(())
            }
            ClientState::Connected => Ok(()),
            ClientState::Closed => Err(ElgasError::Protocol("Client is closed".to_string())),
        }
    }

    /// Current state
    pub fn state(&self) -> ClientState {
        self.state
    }

    async fn request(
        &mut self,
        service: ServiceNumber,
        request: ArchiveRequest,
    ) -> ElgasResult<ArchivePage> {
        if self.state != ClientState::Connected {
            return Err(ElgasError::Protocol(format!(
                "Client not connected (state {:?})",
                self.state
            )));
        }

        let sealed = self.cipher.seal(&request.encode()?)?;
        let envelope = Envelope::new(service, self.addressing, sealed).with_group(self.group);
        let wire = self.codec.encode(&envelope)?;
        self.transport.write_all(&wire).await?;
        self.transport.flush().await?;

        let raw = self.reader.next_frame(&mut self.transport).await?;
        let reply = self.codec.decode(&raw)?;
        if reply.service != service {
            return Err(ElgasError::Protocol(format!(
                "Expected {} reply, got {}",
                service, reply.service
            )));
        }

        let response = ArchiveResponse::decode(&self.cipher.open(&reply.data)?)?;
        if response.status != STATUS_OK {
            return Err(ElgasError::Protocol(format!(
                "Device rejected {} request with status 0x{:02X}",
                service, response.status
            )));
        }

        Ok(ArchivePage {
            data: response.data,
            oldest_record_id: response.oldest_record_id,
        })
    }

    fn archive_request(
        &self,
        archive: Archive,
        amount: u16,
        start: ArchiveStart,
    ) -> ArchiveRequest {
        ArchiveRequest {
            password_id: self.credentials.password_id(),
            password: self.credentials.padded_password(),
            archive,
            amount,
            start,
        }
    }
}

#[async_trait]
impl<T: TransportLayer + 'static> DeviceSession for ElgasClient<T> {
    async fn read_archive_by_time(
        &mut self,
        archive: Archive,
        oldest: NaiveDateTime,
        amount: u16,
    ) -> ElgasResult<ArchivePage> {
        let request = self.archive_request(archive, amount, ArchiveStart::Time(oldest));
        self.request(ServiceNumber::ReadArchiveByTime, request).await
    }

    async fn read_archive(
        &mut self,
        archive: Archive,
        oldest_record_id: u32,
        amount: u16,
    ) -> ElgasResult<ArchivePage> {
        let start = ArchiveStart::RecordId(oldest_record_id);
        let request = self.archive_request(archive, amount, start);
        self.request(ServiceNumber::ReadArchive, request).await
    }

    async fn close(&mut self) -> ElgasResult<()> {
        if self.state != ClientState::Closed {
            self.transport.close().await?;
            self.state = ClientState::Closed;
        }
        Ok(())
    }
}

impl<T: TransportLayer> fmt::Debug for ElgasClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElgasClient")
            .field("peer", &self.transport.peer_address())
            .field("credentials", &self.credentials)
            .field("addressing", &self.addressing)
            .field("group", &self.group)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use elgas_session::ETX;
    use elgas_transport::TcpTransport;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const KEY: &str = "00112233445566778899aabbccddeeff";

    fn credentials() -> Credentials {
        Credentials::new(3, "1234", 1, KEY).unwrap()
    }

    fn addressing() -> Addressing {
        Addressing {
            source_address_1: 0,
            source_address_2: 0,
            destination_address_1: 1,
            destination_address_2: 0,
        }
    }

    async fn connected_pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let peer = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        (
            TcpTransport::from_connected_stream(accepted, Some(Duration::from_secs(5))).unwrap(),
            peer,
        )
    }

    async fn read_wire_frame(peer: &mut TcpStream) -> Vec<u8> {
        let mut frame = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            peer.read_exact(&mut byte).await.unwrap();
            frame.push(byte[0]);
            if byte[0] == ETX {
                return frame;
            }
        }
    }

    /// Answers one request the way a device would
    async fn answer(
        peer: &mut TcpStream,
        status: u8,
        record_id: u32,
        data: Vec<u8>,
    ) -> (Envelope, ArchiveRequest) {
        let codec = ElgasFrameCodec;
        let cipher = ApduCipher::new(&credentials());
        let request = codec.decode(&read_wire_frame(peer).await).unwrap();
        let by_time = request.service == ServiceNumber::ReadArchiveByTime;
        let apdu = ArchiveRequest::decode(&cipher.open(&request.data).unwrap(), by_time).unwrap();

        let response = ArchiveResponse {
            status,
            oldest_record_id: record_id,
            data,
        };
        let reply = request.reply(request.service, cipher.seal(&response.encode()).unwrap());
        peer.write_all(&codec.encode(&reply).unwrap()).await.unwrap();
        (request, apdu)
    }

    #[tokio::test]
    async fn test_read_archive_by_time() {
        let (transport, mut peer) = connected_pair().await;
        let mut client = ElgasClient::new(transport, credentials(), addressing());
        client.connect().await.unwrap();

        let oldest = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let device = tokio::spawn(async move {
            let result = answer(&mut peer, STATUS_OK, 42, vec![7u8; 40]).await;
            (peer, result)
        });

        let page = client
            .read_archive_by_time(Archive::new(2), oldest, 10)
            .await
            .unwrap();
        assert_eq!(page.oldest_record_id, 42);
        assert_eq!(page.data, vec![7u8; 40]);

        let (_peer, (envelope, apdu)) = device.await.unwrap();
        assert_eq!(envelope.service, ServiceNumber::ReadArchiveByTime);
        assert_eq!(envelope.destination_address_1, 1);
        assert_eq!(apdu.password_id, 3);
        assert_eq!(&apdu.password[..4], b"1234");
        assert_eq!(apdu.archive, Archive::new(2));
        assert_eq!(apdu.amount, 10);
        assert_eq!(apdu.start, ArchiveStart::Time(oldest));
    }

    #[tokio::test]
    async fn test_read_archive_by_record_id() {
        let (transport, mut peer) = connected_pair().await;
        let mut client = ElgasClient::new(transport, credentials(), addressing());
        client.connect().await.unwrap();

        let device = tokio::spawn(async move {
            let result = answer(&mut peer, STATUS_OK, 52, Vec::new()).await;
            (peer, result)
        });

        let page = client.read_archive(Archive::new(2), 52, 10).await.unwrap();
        assert!(page.data.is_empty());

        let (_peer, (envelope, apdu)) = device.await.unwrap();
        assert_eq!(envelope.service, ServiceNumber::ReadArchive);
        assert_eq!(apdu.start, ArchiveStart::RecordId(52));
    }

    #[tokio::test]
    async fn test_rejected_request_is_an_error() {
        let (transport, mut peer) = connected_pair().await;
        let mut client = ElgasClient::new(transport, credentials(), addressing());
        client.connect().await.unwrap();

        let device = tokio::spawn(async move {
            answer(&mut peer, 0x05, 0, Vec::new()).await;
            peer
        });

        let result = client.read_archive(Archive::new(2), 0, 10).await;
        assert!(matches!(result, Err(ElgasError::Protocol(_))));
        device.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_before_connect() {
        let (transport, _peer) = connected_pair().await;
        let mut client = ElgasClient::new(transport, credentials(), addressing());
        assert_eq!(client.state(), ClientState::Created);
        let result = client.read_archive(Archive::new(1), 0, 1).await;
        assert!(matches!(result, Err(ElgasError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_peer_hangs_up_mid_readout() {
        let (transport, peer) = connected_pair().await;
        let mut client = ElgasClient::new(transport, credentials(), addressing());
        client.connect().await.unwrap();
        drop(peer);
        assert!(client.read_archive(Archive::new(1), 0, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_close() {
        let (transport, mut peer) = connected_pair().await;
        let mut client = ElgasClient::new(transport, credentials(), addressing());
        client.connect().await.unwrap();
        client.close().await.unwrap();
        assert_eq!(client.state(), ClientState::Closed);
        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
        assert!(client.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_response_buffered_by_earlier_reader() {
        let (mut transport, mut peer) = connected_pair().await;
        let codec = ElgasFrameCodec;
        let cipher = ApduCipher::new(&credentials());

        let call = Envelope::new(ServiceNumber::Call, addressing().swapped(), Vec::new());
        let response = ArchiveResponse {
            status: STATUS_OK,
            oldest_record_id: 7,
            data: vec![1, 2, 3],
        };
        let early = Envelope::new(
            ServiceNumber::ReadArchive,
            addressing().swapped(),
            cipher.seal(&response.encode()).unwrap(),
        );
        let mut burst = codec.encode(&call).unwrap();
        burst.extend(codec.encode(&early).unwrap());
        peer.write_all(&burst).await.unwrap();

        let mut reader = FrameReader::new(64);
        let first = reader.next_frame(&mut transport).await.unwrap();
        assert_eq!(codec.decode(&first).unwrap().service, ServiceNumber::Call);

        let mut client = ElgasClient::new(transport, credentials(), addressing())
            .with_reader(reader)
            .with_group(0x42);
        client.connect().await.unwrap();

        let page = client.read_archive(Archive::new(2), 7, 1).await.unwrap();
        assert_eq!(page.oldest_record_id, 7);
        assert_eq!(page.data, vec![1, 2, 3]);

        let request = codec.decode(&read_wire_frame(&mut peer).await).unwrap();
        assert_eq!(request.service, ServiceNumber::ReadArchive);
        assert_eq!(request.group, 0x42);
    }
}

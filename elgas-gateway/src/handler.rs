//! Call handling
//!
//! One accepted connection is one call. The device announces itself with a
//! CALL envelope; the gateway acknowledges it, looks up how to read the
//! device and then reads its archive over the same socket.

use crate::context::SessionContext;
use crate::readout::{read_archive, ArchiveReadout, ReadoutPlan};
use crate::settings::{ReadoutSettings, SettingsProvider};
use crate::timewindow::ReadoutWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elgas_client::{DeviceSession, ElgasClient};
use elgas_core::{ElgasResult, ServiceNumber};
use elgas_session::{CallRequest, ElgasFrameCodec, Envelope, FrameCodec, FrameReader};
use elgas_transport::{StreamAccessor, TcpTransport};
use std::sync::Arc;

/// Largest escaped frame accepted as a call
pub const MAX_CALL_FRAME: usize = 1024;

/// Opens a device session on an acknowledged connection
///
/// `reader` is the reader the call was read with; bytes the device sent
/// right behind its call are still buffered in it. `ack` is the envelope the
/// call was acknowledged with and carries the addressing and group of every
/// frame sent to the device.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(
        &self,
        transport: TcpTransport,
        reader: FrameReader,
        settings: &ReadoutSettings,
        ack: &Envelope,
    ) -> ElgasResult<Box<dyn DeviceSession>>;
}

/// Opens [`ElgasClient`] sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct ElgasSessionFactory;

#[async_trait]
impl SessionFactory for ElgasSessionFactory {
    async fn open(
        &self,
        transport: TcpTransport,
        reader: FrameReader,
        settings: &ReadoutSettings,
        ack: &Envelope,
    ) -> ElgasResult<Box<dyn DeviceSession>> {
        let mut client = ElgasClient::new(transport, settings.credentials()?, ack.addressing())
            .with_group(ack.group)
            .with_reader(reader);
        client.connect().await?;
        Ok(Box::new(client))
    }
}

/// How a call session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The first envelope was not a call; the connection was closed
    NotACall(ServiceNumber),
    /// The archive was read
    Completed(ArchiveReadout),
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Drives one call session from the first frame to the end of the readout
pub struct CallHandler {
    settings: Arc<dyn SettingsProvider>,
    sessions: Arc<dyn SessionFactory>,
    codec: Arc<dyn FrameCodec>,
    clock: Clock,
}

impl CallHandler {
    pub fn new(settings: Arc<dyn SettingsProvider>, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            settings,
            sessions,
            codec: Arc::new(ElgasFrameCodec),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the frame codec
    pub fn with_codec(mut self, codec: Arc<dyn FrameCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Replace the source of the current time
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Handle one accepted connection
    ///
    /// Any error ends the session; the connection is closed when the
    /// transport is dropped.
    pub async fn handle(
        &self,
        mut transport: TcpTransport,
        ctx: &mut SessionContext,
    ) -> ElgasResult<CallOutcome> {
        let mut reader = FrameReader::new(MAX_CALL_FRAME);
        let raw = reader.next_frame(&mut transport).await?;
        let envelope = self.codec.decode(&raw)?;
        log::debug!("{} Received {}", ctx, envelope);

        if envelope.service != ServiceNumber::Call {
            log::info!(
                "{} Received non call service {}, closing connection",
                ctx,
                envelope.service
            );
            transport.close().await?;
            return Ok(CallOutcome::NotACall(envelope.service));
        }

        let call = CallRequest::decode(&envelope.data)?;
        ctx.bind_device(call.serial_number, &call.station_id);
        log::info!(
            "{} Received call from device with IMSI {}",
            ctx,
            call.imsi_hex()
        );

        let ack = envelope.reply(ServiceNumber::Call, Vec::new());
        transport.write_all(&self.codec.encode(&ack)?).await?;
        transport.flush().await?;
        log::info!("{} Sent call acknowledgement", ctx);

        let settings = self.settings.fetch(call.serial_number).await?;
        let meter_timezone = settings.timezone()?;
        log::debug!(
            "{} Readout settings: {} every {} records of {} bytes in {}",
            ctx,
            settings.archive,
            settings.amount_to_read,
            settings.archive_record_length,
            meter_timezone
        );

        let mut session = self
            .sessions
            .open(transport, reader, &settings, &ack)
            .await?;

        let newest = settings
            .read_until_timestamp
            .unwrap_or_else(|| (self.clock)().fixed_offset());
        let window = ReadoutWindow::new(&settings.oldest_timestamp, &newest, &meter_timezone);
        let plan = ReadoutPlan {
            archive: settings.archive,
            window,
            page_size: settings.amount_to_read,
            record_length: settings.archive_record_length,
        };

        let result = read_archive(session.as_mut(), &plan, ctx).await;
        if let Err(e) = session.close().await {
            log::debug!("{} Failed to close device session: {}", ctx, e);
        }
        let readout = result?;

        log::info!(
            "{} Finished reading archive: {} records, {} bytes in {} pages",
            ctx,
            readout.records,
            readout.data.len(),
            readout.pages
        );
        Ok(CallOutcome::Completed(readout))
    }
}

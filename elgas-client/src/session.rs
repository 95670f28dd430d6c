//! Device session capability
//!
//! The archive readout only needs two operations from a device: read a page
//! of records starting at a time, and read a page starting at a record id.
//! [`DeviceSession`] captures exactly that so the readout logic can run
//! against the real client or a scripted double.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use elgas_core::{Archive, ElgasResult};

/// One page of archive records returned by a device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchivePage {
    /// Concatenated fixed-length records
    pub data: Vec<u8>,
    /// Record id of the oldest record in `data`
    pub oldest_record_id: u32,
}

/// Authenticated session with a device
#[async_trait]
pub trait DeviceSession: Send {
    /// Read up to `amount` records starting at `oldest` (device standard time)
    async fn read_archive_by_time(
        &mut self,
        archive: Archive,
        oldest: NaiveDateTime,
        amount: u16,
    ) -> ElgasResult<ArchivePage>;

    /// Read up to `amount` records starting at record id `oldest_record_id`
    async fn read_archive(
        &mut self,
        archive: Archive,
        oldest_record_id: u32,
        amount: u16,
    ) -> ElgasResult<ArchivePage>;

    /// End the session
    async fn close(&mut self) -> ElgasResult<()> {
        Ok(())
    }
}

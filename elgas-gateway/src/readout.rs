//! Paginated archive readout
//!
//! The first page is requested by time, every following page by record id.
//! The readout ends when a page comes back short (the archive is exhausted)
//! or when a page holds a record at or past the end of the window.

use crate::context::SessionContext;
use crate::timewindow::ReadoutWindow;
use chrono::NaiveDateTime;
use elgas_client::DeviceSession;
use elgas_core::{decode_timestamp, Archive, ElgasError, ElgasResult, BCD_TIMESTAMP_LENGTH};

/// Offset of the BCD timestamp within an archive record
pub const RECORD_TIMESTAMP_OFFSET: usize = 4;

/// Shortest record that still holds a timestamp
pub const MIN_RECORD_LENGTH: usize = RECORD_TIMESTAMP_OFFSET + BCD_TIMESTAMP_LENGTH;

/// What to read and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadoutPlan {
    pub archive: Archive,
    pub window: ReadoutWindow,
    /// Records per page
    pub page_size: u16,
    /// Length of one record in bytes
    pub record_length: usize,
}

impl ReadoutPlan {
    pub fn validate(&self) -> ElgasResult<()> {
        if self.page_size == 0 {
            return Err(ElgasError::InvalidData("Page size must be at least 1".to_string()));
        }
        if self.record_length < MIN_RECORD_LENGTH {
            return Err(ElgasError::InvalidData(format!(
                "Record length {} is shorter than {} bytes",
                self.record_length, MIN_RECORD_LENGTH
            )));
        }
        Ok(())
    }
}

/// Result of a readout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReadout {
    /// Page payloads, concatenated in the order they were read
    pub data: Vec<u8>,
    pub pages: usize,
    pub records: usize,
}

enum Cursor {
    Time(NaiveDateTime),
    RecordId(u32),
}

/// Timestamps of the complete records in a page
///
/// Bytes after the last complete record are not a record.
pub fn record_timestamps(data: &[u8], record_length: usize) -> ElgasResult<Vec<NaiveDateTime>> {
    data.chunks_exact(record_length)
        .map(|record| {
            let end = RECORD_TIMESTAMP_OFFSET + BCD_TIMESTAMP_LENGTH;
            decode_timestamp(&record[RECORD_TIMESTAMP_OFFSET..end])
        })
        .collect()
}

/// Read `plan.archive` from `plan.window.oldest` until the archive is
/// exhausted or `plan.window.newest` is covered
pub async fn read_archive<S>(
    session: &mut S,
    plan: &ReadoutPlan,
    ctx: &SessionContext,
) -> ElgasResult<ArchiveReadout>
where
    S: DeviceSession + ?Sized,
{
    plan.validate()?;
    log::info!(
        "{} Reading {} over {} in pages of {} records",
        ctx,
        plan.archive,
        plan.window,
        plan.page_size
    );

    let page_size = usize::from(plan.page_size);
    let mut readout = ArchiveReadout::default();
    let mut cursor = Cursor::Time(plan.window.oldest);

    loop {
        let page = match cursor {
            Cursor::Time(oldest) => {
                session
                    .read_archive_by_time(plan.archive, oldest, plan.page_size)
                    .await?
            }
            Cursor::RecordId(record_id) => {
                session
                    .read_archive(plan.archive, record_id, plan.page_size)
                    .await?
            }
        };

        let timestamps = record_timestamps(&page.data, plan.record_length)?;
        readout.data.extend_from_slice(&page.data);
        readout.pages += 1;
        readout.records += timestamps.len();
        log::debug!(
            "{} Page {}: {} records from id {}",
            ctx,
            readout.pages,
            timestamps.len(),
            page.oldest_record_id
        );

        let exhausted = timestamps.len() < page_size;
        if exhausted {
            log::info!("{} Archive exhausted after {} pages", ctx, readout.pages);
        }
        let covered = timestamps.iter().any(|ts| *ts >= plan.window.newest);
        if covered {
            log::info!("{} Read up to {}", ctx, plan.window.newest);
        }
        if exhausted || covered {
            break;
        }

        let next = page
            .oldest_record_id
            .checked_add(u32::from(plan.page_size))
            .ok_or_else(|| {
                ElgasError::InvalidData(format!(
                    "Record id {} leaves no room for another page",
                    page.oldest_record_id
                ))
            })?;
        cursor = Cursor::RecordId(next);
    }

    Ok(readout)
}

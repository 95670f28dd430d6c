//! Archive read APDUs
//!
//! Request plaintext (before sealing):
//!
//! ```text
//! password_id | password (16, NUL padded) | archive | amount (u16 LE) | start
//! ```
//!
//! where `start` is a 6-byte BCD timestamp for a by-time read and a u32 LE
//! record id for a by-record read. Response plaintext:
//!
//! ```text
//! status | oldest_record_id (u32 LE) | record data
//! ```

use bytes::{BufMut, BytesMut};
use chrono::NaiveDateTime;
use elgas_core::{
    decode_timestamp, encode_timestamp, Archive, ElgasError, ElgasResult, BCD_TIMESTAMP_LENGTH,
};
use elgas_security::PASSWORD_LENGTH;

const REQUEST_FIXED_LENGTH: usize = 1 + PASSWORD_LENGTH + 1 + 2;
const RESPONSE_HEADER_LENGTH: usize = 5;

/// Status byte of a successful response
pub const STATUS_OK: u8 = 0x00;

/// Where an archive read starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStart {
    /// Oldest record at or after this device standard time
    Time(NaiveDateTime),
    /// Record id cursor returned by a previous read
    RecordId(u32),
}

/// Archive read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub password_id: u8,
    pub password: [u8; PASSWORD_LENGTH],
    pub archive: Archive,
    pub amount: u16,
    pub start: ArchiveStart,
}

impl ArchiveRequest {
    pub fn encode(&self) -> ElgasResult<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(REQUEST_FIXED_LENGTH + BCD_TIMESTAMP_LENGTH);
        buf.put_u8(self.password_id);
        buf.put_slice(&self.password);
        buf.put_u8(self.archive.id());
        buf.put_u16_le(self.amount);
        match &self.start {
            ArchiveStart::Time(timestamp) => buf.put_slice(&encode_timestamp(timestamp)?),
            ArchiveStart::RecordId(id) => buf.put_u32_le(*id),
        }
        Ok(buf.to_vec())
    }

    /// Decode a request; `by_time` selects the start field layout
    pub fn decode(data: &[u8], by_time: bool) -> ElgasResult<Self> {
        let start_length = if by_time { BCD_TIMESTAMP_LENGTH } else { 4 };
        if data.len() != REQUEST_FIXED_LENGTH + start_length {
            return Err(ElgasError::InvalidData(format!(
                "Archive request has wrong length: expected {}, got {}",
                REQUEST_FIXED_LENGTH + start_length,
                data.len()
            )));
        }

        let mut password = [0u8; PASSWORD_LENGTH];
        password.copy_from_slice(&data[1..1 + PASSWORD_LENGTH]);
        let rest = &data[1 + PASSWORD_LENGTH..];
        let start_bytes = &rest[3..];
        let start = if by_time {
            ArchiveStart::Time(decode_timestamp(start_bytes)?)
        } else {
            ArchiveStart::RecordId(u32::from_le_bytes([
                start_bytes[0],
                start_bytes[1],
                start_bytes[2],
                start_bytes[3],
            ]))
        };

        Ok(Self {
            password_id: data[0],
            password,
            archive: Archive::new(rest[0]),
            amount: u16::from_le_bytes([rest[1], rest[2]]),
            start,
        })
    }
}

/// Archive read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResponse {
    pub status: u8,
    pub oldest_record_id: u32,
    pub data: Vec<u8>,
}

impl ArchiveResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LENGTH + self.data.len());
        buf.put_u8(self.status);
        buf.put_u32_le(self.oldest_record_id);
        buf.put_slice(&self.data);
        buf.to_vec()
    }

    pub fn decode(data: &[u8]) -> ElgasResult<Self> {
        if data.len() < RESPONSE_HEADER_LENGTH {
            return Err(ElgasError::InvalidData(format!(
                "Archive response too short: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            status: data[0],
            oldest_record_id: u32::from_le_bytes([data[1], data[2], data[3], data[4]]),
            data: data[RESPONSE_HEADER_LENGTH..].to_vec(),
        })
    }
}

//! ELGAS2 frame structure and encoding/decoding
//!
//! A canonical (unescaped) frame looks like this:
//!
//! ```text
//! STX | ID | service | group | length (u16 LE) |
//! dst1 (u16 LE) | dst2 | src1 (u16 LE) | src2 |
//! data | LRC | checksum | DRC | ETX
//! ```
//!
//! `length` counts every byte after STX, ETX included. The three check bytes
//! cover ID through the last data byte: LRC is their XOR, the checksum their
//! wrapping sum and DRC a rotate-left-then-XOR over them.

use bytes::{BufMut, BytesMut};
use elgas_core::{ElgasError, ElgasResult, ServiceNumber};
use std::fmt;

/// Start of frame
pub const STX: u8 = 0x02;

/// End of frame
pub const ETX: u8 = 0x0D;

/// Frame identifier following STX
pub const FRAME_ID: u8 = 0xFE;

/// Service group used when no other is known
pub const DEFAULT_GROUP: u8 = 0x87;

/// Header length including STX
pub const HEADER_LENGTH: usize = 12;

/// LRC, checksum, DRC and ETX
pub const TRAILER_LENGTH: usize = 4;

/// Source and destination addresses of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Addressing {
    pub source_address_1: u16,
    pub source_address_2: u8,
    pub destination_address_1: u16,
    pub destination_address_2: u8,
}

impl Addressing {
    /// Addressing for the opposite direction
    pub fn swapped(&self) -> Self {
        Self {
            source_address_1: self.destination_address_1,
            source_address_2: self.destination_address_2,
            destination_address_1: self.source_address_1,
            destination_address_2: self.source_address_2,
        }
    }
}

/// Decoded protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub service: ServiceNumber,
    pub group: u8,
    pub source_address_1: u16,
    pub source_address_2: u8,
    pub destination_address_1: u16,
    pub destination_address_2: u8,
    pub data: Vec<u8>,
}

fn lrc(covered: &[u8]) -> u8 {
    covered.iter().fold(0u8, |acc, b| acc ^ b)
}

fn checksum(covered: &[u8]) -> u8 {
    covered.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn drc(covered: &[u8]) -> u8 {
    covered.iter().fold(0u8, |acc, b| acc.rotate_left(1) ^ b)
}

impl Envelope {
    /// Create an envelope from a service, addressing and payload
    pub fn new(service: ServiceNumber, addressing: Addressing, data: Vec<u8>) -> Self {
        Self {
            service,
            group: DEFAULT_GROUP,
            source_address_1: addressing.source_address_1,
            source_address_2: addressing.source_address_2,
            destination_address_1: addressing.destination_address_1,
            destination_address_2: addressing.destination_address_2,
            data,
        }
    }

    /// Addressing of this envelope
    pub fn addressing(&self) -> Addressing {
        Addressing {
            source_address_1: self.source_address_1,
            source_address_2: self.source_address_2,
            destination_address_1: self.destination_address_1,
            destination_address_2: self.destination_address_2,
        }
    }

    /// Replace the service group
    pub fn with_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    /// Build a reply to this envelope: source and destination are swapped,
    /// the group is kept
    pub fn reply(&self, service: ServiceNumber, data: Vec<u8>) -> Self {
        Self::new(service, self.addressing().swapped(), data).with_group(self.group)
    }

    /// Decode an envelope from canonical (unescaped) frame bytes
    ///
    /// # Errors
    /// Returns `FrameInvalid` if the delimiters, frame id, declared length
    /// or any of the trailer check bytes do not match.
    pub fn decode(frame: &[u8]) -> ElgasResult<Self> {
        if frame.len() < HEADER_LENGTH + TRAILER_LENGTH {
            return Err(ElgasError::FrameInvalid(format!(
                "Frame too short: expected at least {}, got {}",
                HEADER_LENGTH + TRAILER_LENGTH,
                frame.len()
            )));
        }
        if frame[0] != STX {
            return Err(ElgasError::FrameInvalid(format!(
                "Expected STX, got 0x{:02X}",
                frame[0]
            )));
        }
        if frame[frame.len() - 1] != ETX {
            return Err(ElgasError::FrameInvalid(format!(
                "Expected ETX, got 0x{:02X}",
                frame[frame.len() - 1]
            )));
        }
        if frame[1] != FRAME_ID {
            return Err(ElgasError::FrameInvalid(format!(
                "Unexpected frame id 0x{:02X}",
                frame[1]
            )));
        }

        let length = u16::from_le_bytes([frame[4], frame[5]]) as usize;
        if length != frame.len() - 1 {
            return Err(ElgasError::FrameInvalid(format!(
                "Frame length mismatch: header declares {} bytes after STX, frame has {}",
                length,
                frame.len() - 1
            )));
        }

        let data_end = frame.len() - TRAILER_LENGTH;
        let covered = &frame[1..data_end];
        let trailer = &frame[data_end..];

        if trailer[0] != lrc(covered) {
            return Err(ElgasError::FrameInvalid(format!(
                "LRC has wrong value: 0x{:02X}, expected 0x{:02X}",
                trailer[0],
                lrc(covered)
            )));
        }
        if trailer[1] != checksum(covered) {
            return Err(ElgasError::FrameInvalid(format!(
                "Checksum has wrong value: 0x{:02X}, expected 0x{:02X}",
                trailer[1],
                checksum(covered)
            )));
        }
        if trailer[2] != drc(covered) {
            return Err(ElgasError::FrameInvalid(format!(
                "DRC has wrong value: 0x{:02X}, expected 0x{:02X}",
                trailer[2],
                drc(covered)
            )));
        }

        Ok(Self {
            service: ServiceNumber::from_u8(frame[2]),
            group: frame[3],
            destination_address_1: u16::from_le_bytes([frame[6], frame[7]]),
            destination_address_2: frame[8],
            source_address_1: u16::from_le_bytes([frame[9], frame[10]]),
            source_address_2: frame[11],
            data: frame[HEADER_LENGTH..data_end].to_vec(),
        })
    }

    /// Encode the envelope to canonical (unescaped) frame bytes
    pub fn encode(&self) -> ElgasResult<Vec<u8>> {
        let frame_length = HEADER_LENGTH + self.data.len() + TRAILER_LENGTH;
        let length = u16::try_from(frame_length - 1).map_err(|_| {
            ElgasError::InvalidData(format!(
                "Envelope payload too large: {} bytes",
                self.data.len()
            ))
        })?;

        let mut buf = BytesMut::with_capacity(frame_length);
        buf.put_u8(STX);
        buf.put_u8(FRAME_ID);
        buf.put_u8(self.service.value());
        buf.put_u8(self.group);
        buf.put_u16_le(length);
        buf.put_u16_le(self.destination_address_1);
        buf.put_u8(self.destination_address_2);
        buf.put_u16_le(self.source_address_1);
        buf.put_u8(self.source_address_2);
        buf.put_slice(&self.data);

        let covered = &buf[1..];
        let trailer = [lrc(covered), checksum(covered), drc(covered)];
        buf.put_slice(&trailer);
        buf.put_u8(ETX);

        Ok(buf.to_vec())
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Envelope {{ service: {}, group: 0x{:02X}, src: {}/{}, dst: {}/{}, data: {} bytes }}",
            self.service,
            self.group,
            self.source_address_1,
            self.source_address_2,
            self.destination_address_1,
            self.destination_address_2,
            self.data.len()
        )
    }
}

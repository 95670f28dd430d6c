//! Protocol constants: service numbers and archive identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service number carried in every frame header
///
/// The service identifies the request type of an envelope. A device that
/// wants to be read out announces itself with [`ServiceNumber::Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceNumber {
    /// Call to dispatching
    Call,
    /// Read archive records starting from a record id
    ReadArchive,
    /// Read archive records starting from a timestamp
    ReadArchiveByTime,
    /// Any other service the gateway does not act on
    Other(u8),
}

impl ServiceNumber {
    pub const CALL: u8 = 0x84;
    pub const READ_ARCHIVE: u8 = 0x5A;
    pub const READ_ARCHIVE_BY_TIME: u8 = 0x5B;

    /// Get service number from wire value
    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::CALL => ServiceNumber::Call,
            Self::READ_ARCHIVE => ServiceNumber::ReadArchive,
            Self::READ_ARCHIVE_BY_TIME => ServiceNumber::ReadArchiveByTime,
            other => ServiceNumber::Other(other),
        }
    }

    /// Get wire value
    pub fn value(&self) -> u8 {
        match self {
            ServiceNumber::Call => Self::CALL,
            ServiceNumber::ReadArchive => Self::READ_ARCHIVE,
            ServiceNumber::ReadArchiveByTime => Self::READ_ARCHIVE_BY_TIME,
            ServiceNumber::Other(value) => *value,
        }
    }
}

impl fmt::Display for ServiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceNumber::Call => write!(f, "CALL"),
            ServiceNumber::ReadArchive => write!(f, "READ_ARCHIVE"),
            ServiceNumber::ReadArchiveByTime => write!(f, "READ_ARCHIVE_BY_TIME"),
            ServiceNumber::Other(value) => write!(f, "0x{:02X}", value),
        }
    }
}

/// Archive identifier on the device
///
/// Devices keep several archives (interval data, daily, monthly, events...).
/// The backend tells the gateway which one to read, so the value is kept
/// opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Archive(u8);

impl Archive {
    pub fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archive#{}", self.0)
    }
}

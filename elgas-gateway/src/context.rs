//! Per-session diagnostic context

use std::fmt;
use std::net::SocketAddr;

/// Identifies one call session in log records
///
/// Created when a connection is accepted and filled in once the calling
/// device has identified itself. It is passed down explicitly, so concurrent
/// sessions never see each other's context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    peer_address: SocketAddr,
    serial_number: Option<u32>,
    station_id: Option<String>,
}

impl SessionContext {
    pub fn new(peer_address: SocketAddr) -> Self {
        Self {
            peer_address,
            serial_number: None,
            station_id: None,
        }
    }

    /// Bind the identity of the calling device
    pub fn bind_device(&mut self, serial_number: u32, station_id: &str) {
        self.serial_number = Some(serial_number);
        self.station_id = Some(station_id.to_string());
    }

    pub fn peer_address(&self) -> SocketAddr {
        self.peer_address
    }

    pub fn serial_number(&self) -> Option<u32> {
        self.serial_number
    }

    pub fn station_id(&self) -> Option<&str> {
        self.station_id.as_deref()
    }
}

impl fmt::Display for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[peer={}", self.peer_address)?;
        if let Some(serial) = self.serial_number {
            write!(f, " device_serial_number={}", serial)?;
        }
        if let Some(station) = &self.station_id {
            write!(f, " station_id={}", station)?;
        }
        write!(f, "]")
    }
}

//! ELGAS2 device session client
//!
//! This crate provides the client side of an archive readout: the
//! [`DeviceSession`] capability and [`ElgasClient`], its implementation over
//! a connection the device opened to the gateway.

pub mod apdu;
pub mod client;
pub mod session;

pub use apdu::{ArchiveRequest, ArchiveResponse, ArchiveStart, STATUS_OK};
pub use client::{ClientState, ElgasClient, MAX_RESPONSE_FRAME};
pub use session::{ArchivePage, DeviceSession};

//! Transport layer module for the ELGAS2 gateway
//!
//! Devices dial in over TCP and the gateway answers on the same socket, so
//! the only transport is a TCP stream that has already been accepted.

pub mod stream;
pub mod tcp;

pub use elgas_core::{ElgasError, ElgasResult};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport};

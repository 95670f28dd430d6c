//! Core types and utilities for the ELGAS2 telemetry protocol
//!
//! This crate provides the error type, protocol constants and the BCD
//! timestamp codec shared by the rest of the gateway.

pub mod bcd;
pub mod constants;
pub mod error;

pub use bcd::{decode_timestamp, encode_timestamp, BCD_TIMESTAMP_LENGTH};
pub use constants::{Archive, ServiceNumber};
pub use error::{ElgasError, ElgasResult};

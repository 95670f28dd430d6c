//! Security module for the ELGAS2 gateway
//!
//! This crate provides device credentials and the authenticated encryption
//! applied to application payloads.

pub mod credentials;
pub mod encryption;

pub use credentials::{Credentials, EncryptionKeyId, PASSWORD_LENGTH};
pub use encryption::ApduCipher;

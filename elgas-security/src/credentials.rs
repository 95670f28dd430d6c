//! Device credentials

use elgas_core::{ElgasError, ElgasResult};
use std::fmt;

/// Length of the password field in a request, NUL padded
pub const PASSWORD_LENGTH: usize = 16;

const KEY_LENGTH: usize = 16;

/// Key slot on the device used to encrypt a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionKeyId {
    Key0 = 0,
    Key1 = 1,
    Key2 = 2,
    Key3 = 3,
}

impl EncryptionKeyId {
    /// Get key ID value
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Get key ID from value
    pub fn from_id(id: u8) -> ElgasResult<Self> {
        match id {
            0 => Ok(EncryptionKeyId::Key0),
            1 => Ok(EncryptionKeyId::Key1),
            2 => Ok(EncryptionKeyId::Key2),
            3 => Ok(EncryptionKeyId::Key3),
            _ => Err(ElgasError::Security(format!("Invalid key ID: {}", id))),
        }
    }
}

/// Password and encryption key used to talk to one device
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    password_id: u8,
    password: String,
    key_id: EncryptionKeyId,
    key: [u8; KEY_LENGTH],
}

impl Credentials {
    /// Build credentials from values as delivered by the backend
    ///
    /// # Arguments
    /// * `password_id` - Password slot on the device
    /// * `password` - Password, at most [`PASSWORD_LENGTH`] bytes
    /// * `key_id` - Encryption key slot (0..=3)
    /// * `key_hex` - AES-128 key as 32 hex characters
    pub fn new(password_id: u8, password: &str, key_id: u8, key_hex: &str) -> ElgasResult<Self> {
        if password.len() > PASSWORD_LENGTH {
            return Err(ElgasError::Security(format!(
                "Password too long: at most {} bytes, got {}",
                PASSWORD_LENGTH,
                password.len()
            )));
        }

        let key = hex::decode(key_hex)
            .map_err(|e| ElgasError::Security(format!("Invalid encryption key: {}", e)))?;
        let key: [u8; KEY_LENGTH] = key.as_slice().try_into().map_err(|_| {
            ElgasError::Security(format!(
                "Invalid AES-128 key length: expected {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            ))
        })?;

        Ok(Self {
            password_id,
            password: password.to_string(),
            key_id: EncryptionKeyId::from_id(key_id)?,
            key,
        })
    }

    pub fn password_id(&self) -> u8 {
        self.password_id
    }

    /// Password NUL padded to [`PASSWORD_LENGTH`]
    pub fn padded_password(&self) -> [u8; PASSWORD_LENGTH] {
        let mut out = [0u8; PASSWORD_LENGTH];
        out[..self.password.len()].copy_from_slice(self.password.as_bytes());
        out
    }

    pub fn key_id(&self) -> EncryptionKeyId {
        self.key_id
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password_id", &self.password_id)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn test_credentials() {
        let creds = Credentials::new(1, "secret", 2, KEY).unwrap();
        assert_eq!(creds.password_id(), 1);
        assert_eq!(creds.key_id(), EncryptionKeyId::Key2);
        assert_eq!(creds.key()[15], 0x0f);
        assert_eq!(&creds.padded_password()[..7], b"secret\0");
    }

    #[test]
    fn test_invalid_key() {
        assert!(Credentials::new(1, "pw", 0, "zz").is_err());
        assert!(Credentials::new(1, "pw", 0, "0011").is_err());
        assert!(Credentials::new(1, "pw", 7, KEY).is_err());
    }

    #[test]
    fn test_password_too_long() {
        assert!(Credentials::new(1, "this password is too long", 0, KEY).is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new(1, "secret", 0, KEY).unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("0a0b"));
    }
}

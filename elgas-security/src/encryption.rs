//! Payload encryption for ELGAS2 application data
//!
//! A sealed payload is laid out as `key_id | nonce (12) | ciphertext + tag`.
//! The key id byte is authenticated as associated data.

use crate::credentials::{Credentials, EncryptionKeyId};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes128Gcm, Key, Nonce,
};
use elgas_core::{ElgasError, ElgasResult};

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// AES-128-GCM sealing of application payloads
pub struct ApduCipher {
    cipher: Aes128Gcm,
    key_id: EncryptionKeyId,
}

impl ApduCipher {
    /// Create a cipher for the key in `credentials`
    pub fn new(credentials: &Credentials) -> Self {
        let key = Key::<Aes128Gcm>::from_slice(credentials.key());
        Self {
            cipher: Aes128Gcm::new(key),
            key_id: credentials.key_id(),
        }
    }

    /// Encrypt a plaintext payload with a fresh random nonce
    pub fn seal(&self, plaintext: &[u8]) -> ElgasResult<Vec<u8>> {
        let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
        let aad = [self.key_id.id()];

        let ciphertext = self
            .cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad: &aad })
            .map_err(|e| ElgasError::Security(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(1 + NONCE_LENGTH + ciphertext.len());
        sealed.push(self.key_id.id());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a sealed payload
    ///
    /// # Errors
    /// Returns `Security` if the payload is truncated, was sealed with a
    /// different key slot, or fails authentication.
    pub fn open(&self, sealed: &[u8]) -> ElgasResult<Vec<u8>> {
        if sealed.len() < 1 + NONCE_LENGTH + TAG_LENGTH {
            return Err(ElgasError::Security(format!(
                "Sealed payload too short: {} bytes",
                sealed.len()
            )));
        }
        if sealed[0] != self.key_id.id() {
            return Err(ElgasError::Security(format!(
                "Payload sealed with key {}, expected key {}",
                sealed[0],
                self.key_id.id()
            )));
        }

        let nonce = Nonce::from_slice(&sealed[1..1 + NONCE_LENGTH]);
        let aad = [sealed[0]];

        self.cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &sealed[1 + NONCE_LENGTH..],
                    aad: &aad,
                },
            )
            .map_err(|e| ElgasError::Security(format!("Decryption failed: {}", e)))
    }
}

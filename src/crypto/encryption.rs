//! AES-256-GCM authenticated encryption.
//!
//! Each call to `Cipher::seal` generates a fresh random 12-byte nonce
//! and prepends it to the ciphertext.  `Cipher::open` splits the nonce
//! back out before decrypting and verifying the tag.
//!
//! Layout of an envelope:
//!   [ 12-byte nonce | ciphertext | 16-byte auth tag ]

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::errors::{KeyStoreError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Length of the cipher key (256 bits).
const KEY_LEN: usize = 32;

/// A sealed value: nonce, ciphertext and tag in one buffer.
///
/// Everything needed to decrypt is inside the envelope except the key.
/// Serialized as a base64 string so snapshot files stay readable JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope(
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")] Vec<u8>,
);

impl Envelope {
    /// Wrap raw envelope bytes (e.g. read back from a backend).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({} bytes)", self.0.len())
    }
}

/// The process cipher.  Holds a 32-byte key that is zeroed on drop.
///
/// Build one from a `MasterKey` with `MasterKey::cipher`; the key is
/// never exposed again and cannot be changed after construction.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Cipher {
    key: [u8; KEY_LEN],
}

impl Cipher {
    pub(crate) fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Envelope> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| KeyStoreError::EncryptionFailed(format!("invalid key length: {e}")))?;

        // A new nonce per call; nothing is derived from a counter.
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| KeyStoreError::EncryptionFailed(format!("encryption error: {e}")))?;

        let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);
        Ok(Envelope(output))
    }

    /// Decrypt an envelope produced by `seal`, verifying its tag.
    pub fn open(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        if envelope.len() < NONCE_LEN + TAG_LEN {
            return Err(KeyStoreError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = envelope.as_bytes().split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| KeyStoreError::DecryptionFailed)?;

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| KeyStoreError::DecryptionFailed)
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cipher([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded byte fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(byte: u8) -> Cipher {
        Cipher::new([byte; KEY_LEN])
    }

    #[test]
    fn seal_then_open_roundtrip() {
        let c = cipher(0xAB);
        let envelope = c.seal(b"sk-test-123").unwrap();
        assert_eq!(envelope.len(), NONCE_LEN + b"sk-test-123".len() + TAG_LEN);
        assert_eq!(c.open(&envelope).unwrap(), b"sk-test-123");
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let c = cipher(0x01);
        let envelope = c.seal(b"").unwrap();
        assert_eq!(c.open(&envelope).unwrap(), b"");
    }

    #[test]
    fn short_envelope_is_rejected() {
        let c = cipher(0x02);
        let result = c.open(&Envelope::from_bytes(vec![0u8; NONCE_LEN + TAG_LEN - 1]));
        assert!(matches!(result, Err(KeyStoreError::DecryptionFailed)));
    }

    #[test]
    fn debug_does_not_print_bytes() {
        let c = cipher(0x03);
        let envelope = c.seal(b"hunter2").unwrap();
        let printed = format!("{envelope:?} {c:?}");
        assert!(printed.contains("bytes"));
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn envelope_serializes_as_base64_string() {
        let envelope = Envelope::from_bytes(vec![1, 2, 3, 4]);
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, "\"AQIDBA==\"");
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}

//! Master key handling and HKDF-SHA256 sub-key derivation.
//!
//! The process holds exactly one `MasterKey`.  From it we derive:
//! - the **cipher key** that seals every stored value, and
//! - a dedicated **HMAC key** that authenticates snapshot files.
//!
//! HKDF (RFC 5869) uses the master key as input keying material and a
//! context string (`info`) to produce independent sub-keys, so the raw
//! master key is never used as a cipher key directly.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::encryption::Cipher;
use super::kdf::{derive_from_passphrase, Argon2Params};
use crate::errors::{KeyStoreError, Result};

/// Length of the master key and derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

const CIPHER_INFO: &[u8] = b"keystore-cipher-v1";
const HMAC_INFO: &[u8] = b"keystore-file-hmac-v1";

/// Run HKDF-SHA256 expand with the given `info`.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| KeyStoreError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte master key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a random key.
    ///
    /// Anything sealed under a generated key is unrecoverable once the
    /// process exits unless the key itself is exported.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Build a master key from operator-supplied material.
    ///
    /// 64 hex characters are taken as the raw key.  Anything else is
    /// treated as a passphrase and stretched with Argon2id.
    pub fn from_material(material: &str, argon2_params: &Argon2Params) -> Result<Self> {
        let material = material.trim();
        if material.is_empty() {
            return Err(KeyStoreError::InvalidMasterKey(
                "master key material is empty".into(),
            ));
        }

        if material.len() == KEY_LEN * 2 && material.bytes().all(|b| b.is_ascii_hexdigit()) {
            let decoded = Zeroizing::new(
                hex::decode(material)
                    .map_err(|e| KeyStoreError::InvalidMasterKey(format!("invalid hex: {e}")))?,
            );
            let mut bytes = [0u8; KEY_LEN];
            bytes.copy_from_slice(&decoded);
            return Ok(Self { bytes });
        }

        let bytes = derive_from_passphrase(material.as_bytes(), argon2_params)?;
        Ok(Self { bytes })
    }

    /// Hex form of the key, for `gen-key` style export.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the value cipher from this master key.
    pub fn cipher(&self) -> Result<Cipher> {
        Ok(Cipher::new(hkdf_derive(&self.bytes, CIPHER_INFO)?))
    }

    /// Derive the snapshot-file HMAC key from this master key.
    pub fn derive_hmac_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        Ok(Zeroizing::new(hkdf_derive(&self.bytes, HMAC_INFO)?))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_material_is_used_verbatim() {
        let hex_key = "ab".repeat(KEY_LEN);
        let key = MasterKey::from_material(&hex_key, &Argon2Params::default()).unwrap();
        assert_eq!(key.as_bytes(), &[0xABu8; KEY_LEN]);
        assert_eq!(key.to_hex().as_str(), hex_key);
    }

    #[test]
    fn empty_material_is_rejected() {
        let result = MasterKey::from_material("   ", &Argon2Params::default());
        assert!(matches!(result, Err(KeyStoreError::InvalidMasterKey(_))));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(MasterKey::generate().as_bytes(), MasterKey::generate().as_bytes());
    }

    #[test]
    fn sub_keys_are_independent_of_each_other() {
        let key = MasterKey::new([0x11; KEY_LEN]);
        let hmac_key = key.derive_hmac_key().unwrap();
        let cipher_key = hkdf_derive(key.as_bytes(), CIPHER_INFO).unwrap();
        assert_ne!(*hmac_key, cipher_key);
        assert_ne!(&cipher_key, key.as_bytes());
    }

    #[test]
    fn cipher_from_same_master_key_opens_envelopes() {
        let key = MasterKey::new([0x22; KEY_LEN]);
        let envelope = key.cipher().unwrap().seal(b"value").unwrap();
        let opened = key.cipher().unwrap().open(&envelope).unwrap();
        assert_eq!(opened, b"value");
    }

    #[test]
    fn debug_is_redacted() {
        let key = MasterKey::new([0x33; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "MasterKey([REDACTED])");
    }
}

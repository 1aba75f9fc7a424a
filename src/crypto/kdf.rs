//! Passphrase-based master key derivation using Argon2id.
//!
//! Operators who configure a passphrase instead of a raw hex key get
//! their master key from Argon2id.  The salt is a fixed application
//! constant: the same passphrase must yield the same key on every
//! start, and there is no per-store header to carry a random salt in
//! memory-backed deployments.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::{KeyStoreError, Result};

/// Length of the derived key in bytes (256 bits, for AES-256).
const KEY_LEN: usize = 32;

/// Application salt for passphrase derivation.
const PASSPHRASE_SALT: &[u8] = b"keystore-master-key-salt-v1";

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters.
///
/// These map 1:1 to the fields in `Settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Derive a 32-byte master key from an operator passphrase.
///
/// The same passphrase + params always produce the same key.
/// Enforces minimum Argon2 parameters to prevent dangerously weak settings.
pub fn derive_from_passphrase(
    passphrase: &[u8],
    argon2_params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    if argon2_params.memory_kib < MIN_MEMORY_KIB {
        return Err(KeyStoreError::KeyDerivationFailed(format!(
            "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
            argon2_params.memory_kib
        )));
    }
    if argon2_params.iterations < 1 {
        return Err(KeyStoreError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if argon2_params.parallelism < 1 {
        return Err(KeyStoreError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KeyStoreError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase, PASSPHRASE_SALT, &mut key)
        .map_err(|e| KeyStoreError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

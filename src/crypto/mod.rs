//! Cryptographic primitives for the key store.
//!
//! This module provides:
//! - AES-256-GCM sealing and opening of value envelopes (`encryption`)
//! - Argon2id passphrase-based master key derivation (`kdf`)
//! - The master key and its HKDF sub-keys (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{Cipher, Envelope};
pub use kdf::Argon2Params;
pub use keys::MasterKey;

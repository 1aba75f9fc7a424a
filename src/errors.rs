use thiserror::Error;

/// All errors that can occur in the key store.
///
/// A missing record is not an error: lookups return `Ok(None)` and
/// deletes return `Ok(false)` so callers can tell "nothing stored here"
/// apart from "stored data is unreadable".
#[derive(Debug, Error)]
pub enum KeyStoreError {
    // --- Input errors ---
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("An active API key named '{0}' already exists")]
    DuplicateKeyName(String),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong master key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid master key material: {0}")]
    InvalidMasterKey(String),

    // --- Codec errors ---
    #[error("Stored value does not match its declared type: {0}")]
    Codec(String),

    // --- Persistence errors ---
    #[error("Invalid store file format: {0}")]
    InvalidStoreFormat(String),

    #[error("HMAC verification failed — store file was tampered with or the master key changed")]
    HmacMismatch,

    #[error("HMAC error: {0}")]
    HmacError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for key store results.
pub type Result<T> = std::result::Result<T, KeyStoreError>;

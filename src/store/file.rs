//! Single-file snapshot backend with HMAC integrity.
//!
//! A store file has this layout:
//!
//! ```text
//! [KSTR: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][body JSON][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`KSTR`): identifies the file as a key store snapshot.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the body JSON begins.
//! - **Header JSON**: serialized `StoreHeader`.
//! - **Body JSON**: serialized `Snapshot` (values are still sealed).
//! - **HMAC-SHA256**: 32-byte tag over header + body bytes, keyed by a
//!   sub-key of the master key.  A changed master key therefore shows
//!   up as an HMAC mismatch before any value is decrypted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use super::backend::{Backend, Snapshot};
use crate::errors::{KeyStoreError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every store file.
const MAGIC: &[u8; 4] = b"KSTR";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// Metadata stored at the beginning of a store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHeader {
    pub version: u8,
    pub saved_at: DateTime<Utc>,
    pub secret_count: usize,
    pub api_key_count: usize,
}

/// Persists snapshots to one file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for FileBackend {
    fn load(&self, hmac_key: &[u8]) -> Result<Snapshot> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no store file yet, starting empty");
            return Ok(Snapshot::default());
        }

        let raw = read_store(&self.path)?;
        verify_hmac(hmac_key, &raw.header_bytes, &raw.body_bytes, &raw.stored_hmac)?;

        // Only trust the body once the HMAC has been checked.
        let snapshot: Snapshot = serde_json::from_slice(&raw.body_bytes)
            .map_err(|e| KeyStoreError::InvalidStoreFormat(format!("body JSON: {e}")))?;

        debug!(
            path = %self.path.display(),
            secrets = snapshot.secrets.len(),
            api_keys = snapshot.api_keys.len(),
            "loaded store file"
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot, hmac_key: &[u8]) -> Result<()> {
        let header = StoreHeader {
            version: CURRENT_VERSION,
            saved_at: Utc::now(),
            secret_count: snapshot.secrets.len(),
            api_key_count: snapshot.api_keys.len(),
        };
        write_store(&self.path, &header, snapshot, hmac_key)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Reading and writing
// ---------------------------------------------------------------------------

/// Write a store file to disk **atomically**.
///
/// 1. Serialize header and body to JSON.
/// 2. Compute HMAC over header + body bytes.
/// 3. Write to a temp file in the same directory (mode 0600 on Unix).
/// 4. Rename temp file over the target path.
pub fn write_store(
    path: &Path,
    header: &StoreHeader,
    snapshot: &Snapshot,
    hmac_key: &[u8],
) -> Result<()> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| KeyStoreError::SerializationError(format!("header: {e}")))?;
    let body_bytes = serde_json::to_vec(snapshot)
        .map_err(|e| KeyStoreError::SerializationError(format!("body: {e}")))?;

    let hmac_tag = compute_hmac(hmac_key, &header_bytes, &body_bytes)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        KeyStoreError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let total = PREFIX_LEN + header_bytes.len() + body_bytes.len() + HMAC_LEN;
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&body_bytes);
    buf.extend_from_slice(&hmac_tag);

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, &buf)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&tmp_path, path)?;

    debug!(path = %path.display(), bytes = buf.len(), "wrote store file");
    Ok(())
}

/// Raw sections of a store file, with the bytes exactly as on disk so
/// the HMAC is verified over what was written.
pub struct RawStore {
    pub header: StoreHeader,
    pub header_bytes: Vec<u8>,
    pub body_bytes: Vec<u8>,
    pub stored_hmac: Vec<u8>,
}

/// Read a store file and split it into its sections.
///
/// The body is left as raw bytes; deserialize it only after
/// `verify_hmac` succeeds.
pub fn read_store(path: &Path) -> Result<RawStore> {
    let data = fs::read(path)?;

    let min_size = PREFIX_LEN + HMAC_LEN;
    if data.len() < min_size {
        return Err(KeyStoreError::InvalidStoreFormat(
            "file too small to be a valid store".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(KeyStoreError::InvalidStoreFormat(
            "missing KSTR magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(KeyStoreError::InvalidStoreFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| KeyStoreError::InvalidStoreFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        KeyStoreError::InvalidStoreFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| end + HMAC_LEN <= data.len())
        .ok_or_else(|| {
            KeyStoreError::InvalidStoreFormat("header length exceeds file size".into())
        })?;

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let body_end = data.len() - HMAC_LEN;
    let body_bytes = data[header_end..body_end].to_vec();
    let stored_hmac = data[body_end..].to_vec();

    let header: StoreHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| KeyStoreError::InvalidStoreFormat(format!("header JSON: {e}")))?;

    Ok(RawStore {
        header,
        header_bytes,
        body_bytes,
        stored_hmac,
    })
}

/// Compute HMAC-SHA256 over header + body bytes.
pub fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], body_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| KeyStoreError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(body_bytes);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the stored HMAC in constant time.
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    body_bytes: &[u8],
    expected_hmac: &[u8],
) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| KeyStoreError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(body_bytes);

    mac.verify_slice(expected_hmac)
        .map_err(|_| KeyStoreError::HmacMismatch)
}

//! The persistence seam.
//!
//! A `Backend` loads and saves whole `Snapshot`s.  The store calls it
//! after every mutation, outside of its collection locks, and serializes
//! those calls itself so a backend never sees two saves at once.

use serde::{Deserialize, Serialize};

use super::record::{ApiKeyRecord, AppSettings, SecretRecord};
use crate::errors::Result;

/// Everything the store persists.  Values stay sealed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub secrets: Vec<SecretRecord>,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_settings: Option<AppSettings>,
}

pub trait Backend: Send + Sync {
    /// Read the last saved snapshot, or an empty one if nothing was saved.
    ///
    /// `hmac_key` authenticates the stored bytes.
    fn load(&self, hmac_key: &[u8]) -> Result<Snapshot>;

    /// Persist `snapshot`, replacing whatever was stored before.
    fn save(&self, snapshot: &Snapshot, hmac_key: &[u8]) -> Result<()>;

    /// Whether `save` writes anywhere.  The store skips building
    /// snapshots for backends that return `false`.
    fn is_persistent(&self) -> bool {
        true
    }

    /// Short human-readable location, for logs.
    fn describe(&self) -> String;
}

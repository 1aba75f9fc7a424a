use super::backend::{Backend, Snapshot};
use crate::errors::Result;

/// A backend that keeps nothing: the store's own maps are the only copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    fn load(&self, _hmac_key: &[u8]) -> Result<Snapshot> {
        Ok(Snapshot::default())
    }

    fn save(&self, _snapshot: &Snapshot, _hmac_key: &[u8]) -> Result<()> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

//! Namespace + key addressed secret repository.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use super::record::{next_timestamp, SecretId, SecretRecord, SecretSummary};
use crate::codec::{self, Value};
use crate::crypto::Cipher;
use crate::errors::Result;

/// In-memory map of `(namespace, key)` -> encrypted record.
///
/// Each slot is read and written under the lock as a unit.  Sealing and
/// opening happen outside it so slow crypto on one key never blocks
/// readers of another.
#[derive(Debug, Default)]
pub struct SecretRepository {
    records: RwLock<HashMap<SecretId, SecretRecord>>,
}

impl SecretRepository {
    pub fn from_records(records: Vec<SecretRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id(), r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }

    /// Add or replace a secret.  `created_at` survives a replace.
    pub fn set(
        &self,
        cipher: &Cipher,
        namespace: &str,
        key: &str,
        value: &Value,
        metadata: Option<serde_json::Value>,
    ) -> Result<SecretSummary> {
        let record = self.stage_set(cipher, namespace, key, value, metadata)?;
        let summary = record.summary();
        self.insert(record);
        Ok(summary)
    }

    /// Build the record `set` would store, without storing it.
    ///
    /// Timestamps are taken against the current slot, so the record is
    /// only valid to `insert` while writers are serialized.
    pub fn stage_set(
        &self,
        cipher: &Cipher,
        namespace: &str,
        key: &str,
        value: &Value,
        metadata: Option<serde_json::Value>,
    ) -> Result<SecretRecord> {
        let id = SecretId::new(namespace, key)?;
        let plaintext = zeroize::Zeroizing::new(codec::encode(value)?);
        let envelope = cipher.seal(&plaintext)?;

        let previous = self
            .records
            .read()
            .get(&id)
            .map(|r| (r.created_at, r.updated_at));
        let updated_at = next_timestamp(previous.map(|(_, updated)| updated));
        let created_at = previous.map_or(updated_at, |(created, _)| created);

        Ok(SecretRecord {
            namespace: id.namespace,
            key: id.key,
            envelope,
            value_type: value.value_type(),
            metadata,
            created_at,
            updated_at,
        })
    }

    /// Store a staged record.  Returns whether it replaced one.
    pub fn insert(&self, record: SecretRecord) -> bool {
        let id = record.id();
        let value_type = record.value_type;
        let replaced = self.records.write().insert(id.clone(), record).is_some();
        debug!(
            namespace = %id.namespace,
            key = %id.key,
            value_type = %value_type,
            replaced,
            "stored secret"
        );
        replaced
    }

    /// Decrypt and decode a secret.  `Ok(None)` when nothing is stored.
    pub fn get(&self, cipher: &Cipher, namespace: &str, key: &str) -> Result<Option<Value>> {
        let id = SecretId::new(namespace, key)?;

        // Clone the slot so the lock is released before decrypting.
        let record = match self.records.read().get(&id) {
            Some(record) => record.clone(),
            None => return Ok(None),
        };

        let plaintext = cipher.open(&record.envelope)?;
        codec::decode(record.value_type, plaintext).map(Some)
    }

    /// Remove a secret.  Returns whether one existed.
    pub fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        match self.stage_delete(namespace, key)? {
            Some(id) => Ok(self.remove(&id)),
            None => Ok(false),
        }
    }

    /// Validate a delete and return the identity if something is stored there.
    pub fn stage_delete(&self, namespace: &str, key: &str) -> Result<Option<SecretId>> {
        let id = SecretId::new(namespace, key)?;
        let present = self.records.read().contains_key(&id);
        Ok(present.then_some(id))
    }

    pub fn remove(&self, id: &SecretId) -> bool {
        let removed = self.records.write().remove(id).is_some();
        if removed {
            debug!(namespace = %id.namespace, key = %id.key, "deleted secret");
        }
        removed
    }

    /// Safe summaries of every secret in `namespace`, sorted by key.
    pub fn list(&self, namespace: &str) -> Result<Vec<SecretSummary>> {
        super::record::validate_ident("namespace", namespace)?;

        let mut list: Vec<SecretSummary> = self
            .records
            .read()
            .values()
            .filter(|r| r.namespace == namespace)
            .map(SecretRecord::summary)
            .collect();

        list.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(list)
    }

    /// Distinct namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .read()
            .keys()
            .map(|id| id.namespace.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of every record, sorted by identity, for persistence.
    pub fn records(&self) -> Vec<SecretRecord> {
        let mut list: Vec<SecretRecord> = self.records.read().values().cloned().collect();
        list.sort_by(|a, b| (&a.namespace, &a.key).cmp(&(&b.namespace, &b.key)));
        list
    }
}

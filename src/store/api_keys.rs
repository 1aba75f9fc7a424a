//! Registry of named, typed, expirable credentials.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::record::{
    next_timestamp, validate_ident, ApiKeyRecord, ApiKeySummary, ApiKeyUpdate, NewApiKey,
};
use crate::crypto::Cipher;
use crate::errors::{KeyStoreError, Result};

/// How the registry treats several keys sharing a `key_name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyNamePolicy {
    /// At most one *active* key per name; a second is rejected.
    #[default]
    UniqueActive,
    /// Duplicates allowed.  Name lookup returns the oldest active key.
    FirstMatch,
}

/// UUID-keyed credential records with name-based lookup.
#[derive(Debug, Default)]
pub struct ApiKeyRegistry {
    records: RwLock<HashMap<Uuid, ApiKeyRecord>>,
    policy: KeyNamePolicy,
}

/// Oldest first, ties broken by id, so "first" is stable.
fn creation_order(a: &ApiKeyRecord, b: &ApiKeyRecord) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(KeyStoreError::Validation("value cannot be empty".into()));
    }
    Ok(())
}

impl ApiKeyRegistry {
    pub fn new(policy: KeyNamePolicy) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn from_records(records: Vec<ApiKeyRecord>, policy: KeyNamePolicy) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            records: RwLock::new(map),
            policy,
        }
    }

    pub fn policy(&self) -> KeyNamePolicy {
        self.policy
    }

    /// Under `UniqueActive`, fail if another active key already uses `name`.
    fn check_name_free(
        &self,
        records: &HashMap<Uuid, ApiKeyRecord>,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<()> {
        if self.policy == KeyNamePolicy::FirstMatch {
            return Ok(());
        }
        let taken = records
            .values()
            .any(|r| r.is_active && r.key_name == name && Some(r.id) != except);
        if taken {
            return Err(KeyStoreError::DuplicateKeyName(name.to_string()));
        }
        Ok(())
    }

    /// Store a new credential under a fresh id.
    pub fn create(&self, cipher: &Cipher, new_key: NewApiKey) -> Result<ApiKeySummary> {
        let record = self.stage_create(cipher, new_key)?;
        let summary = record.summary();
        self.insert(record);
        Ok(summary)
    }

    /// Validate and seal a new credential without storing it.
    pub fn stage_create(&self, cipher: &Cipher, new_key: NewApiKey) -> Result<ApiKeyRecord> {
        validate_ident("key name", &new_key.key_name)?;
        validate_ident("key type", &new_key.key_type)?;
        validate_value(&new_key.value)?;

        let value = Zeroizing::new(new_key.value);
        let envelope = cipher.seal(value.as_bytes())?;

        let records = self.records.read();
        if new_key.is_active {
            self.check_name_free(&records, &new_key.key_name, None)?;
        }

        // Strictly after every existing key, so creation order is total.
        let now = next_timestamp(records.values().map(|r| r.created_at).max());
        Ok(ApiKeyRecord {
            id: Uuid::new_v4(),
            key_name: new_key.key_name,
            key_type: new_key.key_type,
            envelope,
            description: new_key.description,
            is_active: new_key.is_active,
            expires_at: new_key.expires_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// Store a staged record, replacing any record with the same id.
    pub fn insert(&self, record: ApiKeyRecord) {
        let (id, key_name) = (record.id, record.key_name.clone());
        let replaced = self.records.write().insert(id, record).is_some();
        debug!(id = %id, key_name = %key_name, replaced, "stored api key");
    }

    /// Decrypt the value of the first active key named `key_name`.
    pub fn get_value(&self, cipher: &Cipher, key_name: &str) -> Result<Option<String>> {
        let envelope = {
            let records = self.records.read();
            let found = records
                .values()
                .filter(|r| r.is_active && r.key_name == key_name)
                .min_by(|a, b| creation_order(a, b));
            match found {
                Some(record) => record.envelope.clone(),
                None => return Ok(None),
            }
        };

        let plaintext = cipher.open(&envelope)?;
        String::from_utf8(plaintext).map(Some).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            zeroize::Zeroize::zeroize(&mut bad_bytes);
            KeyStoreError::Codec("api key value is not valid UTF-8".into())
        })
    }

    pub fn get(&self, id: Uuid) -> Option<ApiKeySummary> {
        self.records.read().get(&id).map(ApiKeyRecord::summary)
    }

    /// Every key in creation order, without credential material.
    pub fn list(&self) -> Vec<ApiKeySummary> {
        let records = self.records.read();
        let mut list: Vec<&ApiKeyRecord> = records.values().collect();
        list.sort_by(|a, b| creation_order(a, b));
        list.into_iter().map(ApiKeyRecord::summary).collect()
    }

    /// Apply a partial update.  `Ok(None)` when `id` is unknown.
    pub fn update(
        &self,
        cipher: &Cipher,
        id: Uuid,
        update: ApiKeyUpdate,
    ) -> Result<Option<ApiKeySummary>> {
        let Some(record) = self.stage_update(cipher, id, update)? else {
            return Ok(None);
        };
        let summary = record.summary();
        self.insert(record);
        Ok(Some(summary))
    }

    /// Build the updated record without storing it.
    ///
    /// The name check only runs when the update could create a new
    /// active holder of a name: a rename or an activation.
    pub fn stage_update(
        &self,
        cipher: &Cipher,
        id: Uuid,
        update: ApiKeyUpdate,
    ) -> Result<Option<ApiKeyRecord>> {
        if let Some(name) = &update.key_name {
            validate_ident("key name", name)?;
        }
        if let Some(key_type) = &update.key_type {
            validate_ident("key type", key_type)?;
        }
        let envelope = match update.value {
            Some(value) => {
                let value = Zeroizing::new(value);
                validate_value(&value)?;
                Some(cipher.seal(value.as_bytes())?)
            }
            None => None,
        };

        let records = self.records.read();
        let Some(current) = records.get(&id) else {
            return Ok(None);
        };
        let mut record = current.clone();

        if let Some(key_name) = update.key_name {
            record.key_name = key_name;
        }
        if let Some(is_active) = update.is_active {
            record.is_active = is_active;
        }
        let renamed = record.key_name != current.key_name;
        let activated = record.is_active && !current.is_active;
        if record.is_active && (renamed || activated) {
            self.check_name_free(&records, &record.key_name, Some(id))?;
        }
        drop(records);

        if let Some(key_type) = update.key_type {
            record.key_type = key_type;
        }
        if let Some(envelope) = envelope {
            record.envelope = envelope;
        }
        if let Some(description) = update.description {
            record.description = description;
        }
        if let Some(expires_at) = update.expires_at {
            record.expires_at = expires_at;
        }
        record.updated_at = next_timestamp(Some(record.updated_at));
        Ok(Some(record))
    }

    /// Remove a key.  Returns whether it existed.
    pub fn delete(&self, id: Uuid) -> bool {
        let removed = self.records.write().remove(&id).is_some();
        if removed {
            debug!(id = %id, "deleted api key");
        }
        removed
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records.read().contains_key(&id)
    }

    /// Copy of every record in creation order, for persistence.
    pub fn records(&self) -> Vec<ApiKeyRecord> {
        let mut list: Vec<ApiKeyRecord> = self.records.read().values().cloned().collect();
        list.sort_by(creation_order);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Envelope, MasterKey};

    fn fixture(policy: KeyNamePolicy) -> (ApiKeyRegistry, Cipher) {
        let cipher = MasterKey::new([9u8; 32]).cipher().unwrap();
        (ApiKeyRegistry::new(policy), cipher)
    }

    #[test]
    fn create_reveal_list_delete() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        let created = registry
            .create(&cipher, NewApiKey::new("openai", "api_key", "sk-test-123"))
            .unwrap();
        assert!(created.is_active);

        assert_eq!(
            registry.get_value(&cipher, "openai").unwrap().as_deref(),
            Some("sk-test-123")
        );
        assert_eq!(registry.list(), vec![created.clone()]);

        assert!(registry.delete(created.id));
        assert!(!registry.delete(created.id));
        assert_eq!(registry.get_value(&cipher, "openai").unwrap(), None);
    }

    #[test]
    fn inactive_keys_are_hidden_from_lookup_but_listed() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        registry
            .create(&cipher, NewApiKey::new("stripe", "secret", "sk_live").inactive())
            .unwrap();
        assert_eq!(registry.get_value(&cipher, "stripe").unwrap(), None);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn unique_active_rejects_duplicate_names() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        registry
            .create(&cipher, NewApiKey::new("github", "token", "ghp_1"))
            .unwrap();
        let result = registry.create(&cipher, NewApiKey::new("github", "token", "ghp_2"));
        assert!(matches!(result, Err(KeyStoreError::DuplicateKeyName(_))));

        // An inactive duplicate is fine.
        registry
            .create(&cipher, NewApiKey::new("github", "token", "ghp_3").inactive())
            .unwrap();
    }

    #[test]
    fn reactivating_into_a_taken_name_is_rejected() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        registry
            .create(&cipher, NewApiKey::new("github", "token", "ghp_1"))
            .unwrap();
        let old = registry
            .create(&cipher, NewApiKey::new("github", "token", "ghp_0").inactive())
            .unwrap();

        let update = ApiKeyUpdate {
            is_active: Some(true),
            ..Default::default()
        };
        let result = registry.update(&cipher, old.id, update);
        assert!(matches!(result, Err(KeyStoreError::DuplicateKeyName(_))));
    }

    #[test]
    fn first_match_returns_oldest_active() {
        let (registry, cipher) = fixture(KeyNamePolicy::FirstMatch);
        registry
            .create(&cipher, NewApiKey::new("aws", "secret", "first"))
            .unwrap();
        registry
            .create(&cipher, NewApiKey::new("aws", "secret", "second"))
            .unwrap();
        assert_eq!(
            registry.get_value(&cipher, "aws").unwrap().as_deref(),
            Some("first")
        );
    }

    #[test]
    fn update_changes_fields_and_reencrypts() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        let created = registry
            .create(
                &cipher,
                NewApiKey::new("openai", "api_key", "sk-old").description("primary"),
            )
            .unwrap();

        let update = ApiKeyUpdate {
            value: Some("sk-new".into()),
            description: Some(None),
            key_type: Some("token".into()),
            ..Default::default()
        };
        let updated = registry
            .update(&cipher, created.id, update)
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.key_type, "token");
        assert_eq!(updated.description, None);
        assert_eq!(
            registry.get_value(&cipher, "openai").unwrap().as_deref(),
            Some("sk-new")
        );
    }

    #[test]
    fn update_unknown_id_is_none() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        let result = registry
            .update(&cipher, Uuid::new_v4(), ApiKeyUpdate::default())
            .unwrap();
        assert!(result.is_none());
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        assert!(matches!(
            registry.create(&cipher, NewApiKey::new("", "api_key", "v")),
            Err(KeyStoreError::Validation(_))
        ));
        assert!(registry
            .create(&cipher, NewApiKey::new("n", "api_key", ""))
            .is_err());
    }

    #[test]
    fn corrupt_envelope_surfaces_decryption_error() {
        let (registry, cipher) = fixture(KeyNamePolicy::UniqueActive);
        let created = registry
            .create(&cipher, NewApiKey::new("openai", "api_key", "sk-test-123"))
            .unwrap();

        let mut records = registry.records();
        let mut bytes = records[0].envelope.as_bytes().to_vec();
        bytes[20] ^= 0x01;
        records[0].envelope = Envelope::from_bytes(bytes);
        let corrupted = ApiKeyRegistry::from_records(records, registry.policy());

        assert!(corrupted.get(created.id).is_some());
        assert!(matches!(
            corrupted.get_value(&cipher, "openai"),
            Err(KeyStoreError::DecryptionFailed)
        ));
    }

    #[test]
    fn metadata_update_on_a_legacy_duplicate_is_allowed() {
        let (loose, cipher) = fixture(KeyNamePolicy::FirstMatch);
        let first = loose
            .create(&cipher, NewApiKey::new("aws", "secret", "one"))
            .unwrap();
        loose
            .create(&cipher, NewApiKey::new("aws", "secret", "two"))
            .unwrap();

        // Same records, now under the stricter policy.
        let strict = ApiKeyRegistry::from_records(loose.records(), KeyNamePolicy::UniqueActive);

        let update = ApiKeyUpdate {
            description: Some(Some("rotated quarterly".into())),
            ..Default::default()
        };
        let updated = strict.update(&cipher, first.id, update).unwrap().unwrap();
        assert_eq!(updated.description.as_deref(), Some("rotated quarterly"));

        // Renaming into the shared name is still refused.
        let other = strict
            .create(&cipher, NewApiKey::new("gcp", "secret", "three"))
            .unwrap();
        let rename = ApiKeyUpdate {
            key_name: Some("aws".into()),
            ..Default::default()
        };
        assert!(matches!(
            strict.update(&cipher, other.id, rename),
            Err(KeyStoreError::DuplicateKeyName(_))
        ));
    }
}

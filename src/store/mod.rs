//! The key store service.
//!
//! This module provides:
//! - Record types and their safe projections (`record`)
//! - The namespaced secret repository (`secrets`)
//! - The API key registry (`api_keys`)
//! - The application profile (`app`)
//! - Persistence backends (`backend`, `memory`, `file`)
//! - `KeyStore`, which ties them to one cipher and one backend

pub mod api_keys;
pub mod app;
pub mod backend;
pub mod file;
pub mod memory;
pub mod record;
pub mod secrets;

use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::codec::Value;
use crate::config::Settings;
use crate::crypto::keys::KEY_LEN;
use crate::crypto::{Cipher, MasterKey};
use crate::errors::Result;

pub use api_keys::{ApiKeyRegistry, KeyNamePolicy};
pub use app::AppProfile;
pub use backend::{Backend, Snapshot};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use record::{
    ApiKeyRecord, ApiKeySummary, ApiKeyUpdate, AppSettings, AppSettingsUpdate, NewApiKey,
    NewAppSettings, SecretId, SecretRecord, SecretSummary,
};
pub use secrets::SecretRepository;

/// Options fixed for the lifetime of a `KeyStore`.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key_name_policy: KeyNamePolicy,
    /// Application id for the seeded profile.  A random UUID if `None`.
    pub app_id: Option<String>,
    pub app_name: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_name_policy: KeyNamePolicy::default(),
            app_id: None,
            app_name: "Key Store".to_string(),
        }
    }
}

/// One encrypted store per process.
///
/// Construct it once with `KeyStore::open` (or `from_settings`) and share
/// it by reference or `Arc`.  All methods take `&self`.  Reads only take
/// the read lock of one collection; writes are serialized and never
/// hold a collection lock across backend I/O.
pub struct KeyStore {
    cipher: Cipher,
    hmac_key: Zeroizing<[u8; KEY_LEN]>,
    ephemeral_key: bool,
    secrets: SecretRepository,
    api_keys: ApiKeyRegistry,
    app: AppProfile,
    backend: Box<dyn Backend>,
    /// Serializes writers.  A writer stages its change, saves the
    /// snapshot with the change applied, and only then updates the
    /// maps, all under this lock.
    write_lock: Mutex<()>,
}

/// One staged mutation, applied to the maps only after it is saved.
enum Change {
    PutSecret(SecretRecord),
    RemoveSecret(SecretId),
    PutApiKey(ApiKeyRecord),
    RemoveApiKey(Uuid),
    PutApp(AppSettings),
}

impl Change {
    fn apply_to(&self, snapshot: &mut Snapshot) {
        match self {
            Change::PutSecret(record) => {
                snapshot
                    .secrets
                    .retain(|r| r.namespace != record.namespace || r.key != record.key);
                snapshot.secrets.push(record.clone());
            }
            Change::RemoveSecret(id) => snapshot
                .secrets
                .retain(|r| r.namespace != id.namespace || r.key != id.key),
            Change::PutApiKey(record) => {
                snapshot.api_keys.retain(|r| r.id != record.id);
                snapshot.api_keys.push(record.clone());
            }
            Change::RemoveApiKey(id) => snapshot.api_keys.retain(|r| r.id != *id),
            Change::PutApp(settings) => snapshot.app_settings = Some(settings.clone()),
        }
    }
}

impl KeyStore {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open a store over `backend`.
    ///
    /// With `master_key == None` a random key is generated for this
    /// process only: nothing sealed under it can be read after a restart.
    pub fn open(
        master_key: Option<MasterKey>,
        backend: Box<dyn Backend>,
        options: StoreOptions,
    ) -> Result<Self> {
        let ephemeral_key = master_key.is_none();
        let master_key = match master_key {
            Some(key) => key,
            None => {
                warn!(
                    backend = %backend.describe(),
                    "no master key configured; using an ephemeral key. \
                     Stored secrets will be unrecoverable after this process exits"
                );
                MasterKey::generate()
            }
        };

        let cipher = master_key.cipher()?;
        let hmac_key = master_key.derive_hmac_key()?;
        drop(master_key);

        let snapshot = backend.load(hmac_key.as_slice())?;
        let store = Self {
            cipher,
            hmac_key,
            ephemeral_key,
            secrets: SecretRepository::from_records(snapshot.secrets),
            api_keys: ApiKeyRegistry::from_records(snapshot.api_keys, options.key_name_policy),
            app: AppProfile::from_settings(snapshot.app_settings),
            backend,
            write_lock: Mutex::new(()),
        };

        let seeded = store.app.stage_seed(NewAppSettings {
            app_id: options
                .app_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            app_name: options.app_name,
            description: Some("Encrypted secret and API key store".to_string()),
            is_active: true,
            metadata: None,
        })?;
        if let Some(settings) = seeded {
            let _guard = store.write_lock.lock();
            store.commit(Change::PutApp(settings))?;
        }

        info!(
            backend = %store.backend.describe(),
            secrets = store.secrets.len(),
            api_keys = store.api_keys.list().len(),
            "key store opened"
        );
        Ok(store)
    }

    /// A memory-only store with default options.
    pub fn in_memory(master_key: Option<MasterKey>) -> Result<Self> {
        Self::open(master_key, Box::new(MemoryBackend), StoreOptions::default())
    }

    /// Open the store described by `settings`.
    ///
    /// Master key material comes from the environment variable named by
    /// `settings.master_key_env`.  `store_override` wins over
    /// `settings.store_file`; with neither, the store is memory-only.
    pub fn from_settings(
        settings: &Settings,
        project_dir: &Path,
        store_override: Option<&Path>,
    ) -> Result<Self> {
        let master_key = match settings.master_key_material() {
            Some(material) => Some(MasterKey::from_material(
                &material,
                &settings.argon2_params(),
            )?),
            None => None,
        };

        let backend: Box<dyn Backend> = match store_override {
            Some(path) => Box::new(FileBackend::new(path)),
            None => match settings.store_path(project_dir) {
                Some(path) => Box::new(FileBackend::new(path)),
                None => Box::new(MemoryBackend),
            },
        };

        let options = StoreOptions {
            key_name_policy: settings.key_name_policy,
            app_id: settings.app_id.clone(),
            app_name: settings.app_name.clone(),
        };
        Self::open(master_key, backend, options)
    }

    /// Flush and release the store.  A no-op for memory backends.
    pub fn close(self) -> Result<()> {
        self.flush()?;
        debug!(backend = %self.backend.describe(), "key store closed");
        Ok(())
    }

    /// Whether this store runs on a generated, non-persistent key.
    pub fn uses_ephemeral_key(&self) -> bool {
        self.ephemeral_key
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            secrets: self.secrets.records(),
            api_keys: self.api_keys.records(),
            app_settings: self.app.get(),
        }
    }

    fn flush(&self) -> Result<()> {
        if !self.backend.is_persistent() {
            return Ok(());
        }
        let _guard = self.write_lock.lock();
        self.backend.save(&self.snapshot(), self.hmac_key.as_slice())
    }

    /// Save the current state with `change` applied, then apply it to
    /// the maps.  A failed save leaves the maps untouched.
    ///
    /// Callers hold `write_lock`.
    fn commit(&self, change: Change) -> Result<()> {
        if self.backend.is_persistent() {
            let mut snapshot = self.snapshot();
            change.apply_to(&mut snapshot);
            self.backend.save(&snapshot, self.hmac_key.as_slice())?;
        }
        match change {
            Change::PutSecret(record) => {
                self.secrets.insert(record);
            }
            Change::RemoveSecret(id) => {
                self.secrets.remove(&id);
            }
            Change::PutApiKey(record) => self.api_keys.insert(record),
            Change::RemoveApiKey(id) => {
                self.api_keys.delete(id);
            }
            Change::PutApp(settings) => self.app.replace(settings),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Namespaced secrets
    // ------------------------------------------------------------------

    /// Add or replace the secret at `(namespace, key)`.
    pub fn set_secret(
        &self,
        namespace: &str,
        key: &str,
        value: impl Into<Value>,
        metadata: Option<serde_json::Value>,
    ) -> Result<SecretSummary> {
        let value = value.into();
        let _guard = self.write_lock.lock();
        let record = self
            .secrets
            .stage_set(&self.cipher, namespace, key, &value, metadata)?;
        let summary = record.summary();
        self.commit(Change::PutSecret(record))?;
        Ok(summary)
    }

    /// Decrypt the secret at `(namespace, key)`; `Ok(None)` if absent.
    pub fn get_secret(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        self.secrets.get(&self.cipher, namespace, key)
    }

    /// Delete the secret at `(namespace, key)`; `Ok(false)` if absent.
    pub fn delete_secret(&self, namespace: &str, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let Some(id) = self.secrets.stage_delete(namespace, key)? else {
            return Ok(false);
        };
        self.commit(Change::RemoveSecret(id))?;
        Ok(true)
    }

    /// Safe summaries of a namespace, sorted by key.
    pub fn list_secrets(&self, namespace: &str) -> Result<Vec<SecretSummary>> {
        self.secrets.list(namespace)
    }

    pub fn list_namespaces(&self) -> Vec<String> {
        self.secrets.namespaces()
    }

    // ------------------------------------------------------------------
    // API keys
    // ------------------------------------------------------------------

    pub fn create_api_key(&self, new_key: NewApiKey) -> Result<ApiKeySummary> {
        let _guard = self.write_lock.lock();
        let record = self.api_keys.stage_create(&self.cipher, new_key)?;
        let summary = record.summary();
        self.commit(Change::PutApiKey(record))?;
        Ok(summary)
    }

    /// Reveal the value of the first active key named `key_name`.
    pub fn get_api_key_value(&self, key_name: &str) -> Result<Option<String>> {
        self.api_keys.get_value(&self.cipher, key_name)
    }

    pub fn get_api_key(&self, id: Uuid) -> Option<ApiKeySummary> {
        self.api_keys.get(id)
    }

    pub fn list_api_keys(&self) -> Vec<ApiKeySummary> {
        self.api_keys.list()
    }

    pub fn update_api_key(&self, id: Uuid, update: ApiKeyUpdate) -> Result<Option<ApiKeySummary>> {
        let _guard = self.write_lock.lock();
        let Some(record) = self.api_keys.stage_update(&self.cipher, id, update)? else {
            return Ok(None);
        };
        let summary = record.summary();
        self.commit(Change::PutApiKey(record))?;
        Ok(Some(summary))
    }

    pub fn delete_api_key(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock();
        if !self.api_keys.contains(id) {
            return Ok(false);
        }
        self.commit(Change::RemoveApiKey(id))?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Application profile
    // ------------------------------------------------------------------

    pub fn app_settings(&self) -> Option<AppSettings> {
        self.app.get()
    }

    pub fn set_app_settings(&self, new: NewAppSettings) -> Result<AppSettings> {
        let _guard = self.write_lock.lock();
        let settings = AppProfile::stage_set(new)?;
        self.commit(Change::PutApp(settings.clone()))?;
        Ok(settings)
    }

    pub fn update_app_settings(
        &self,
        id: Uuid,
        update: AppSettingsUpdate,
    ) -> Result<Option<AppSettings>> {
        let _guard = self.write_lock.lock();
        let Some(settings) = self.app.stage_update(id, update)? else {
            return Ok(None);
        };
        self.commit(Change::PutApp(settings.clone()))?;
        Ok(Some(settings))
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("backend", &self.backend.describe())
            .field("ephemeral_key", &self.ephemeral_key)
            .field("secrets", &self.secrets.len())
            .finish_non_exhaustive()
    }
}

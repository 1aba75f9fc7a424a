use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{KeyStoreError, Result};
use crate::store::KeyNamePolicy;

/// Project-level configuration, loaded from `.keystore.toml`.
///
/// Every field has a default so the store works without any config
/// file at all (memory-only, master key from `KEYSTORE_MASTER_KEY`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Store file (relative to the project root).  Memory-only if unset.
    #[serde(default)]
    pub store_file: Option<String>,

    /// Environment variable holding the master key material.
    #[serde(default = "default_master_key_env")]
    pub master_key_env: String,

    /// How API keys sharing a name are handled.
    #[serde(default)]
    pub key_name_policy: KeyNamePolicy,

    /// Application id recorded in the app profile.
    #[serde(default)]
    pub app_id: Option<String>,

    /// Application name recorded in the app profile.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_master_key_env() -> String {
    "KEYSTORE_MASTER_KEY".to_string()
}

fn default_app_name() -> String {
    "Key Store".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_file: None,
            master_key_env: default_master_key_env(),
            key_name_policy: KeyNamePolicy::default(),
            app_id: None,
            app_name: default_app_name(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".keystore.toml";

    /// Load settings from `<project_dir>/.keystore.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            KeyStoreError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.master_key_env.trim().is_empty() {
            return Err(KeyStoreError::ConfigError(
                "master_key_env cannot be empty".into(),
            ));
        }

        Ok(settings)
    }

    /// Full path of the store file, if one is configured.
    pub fn store_path(&self, project_dir: &Path) -> Option<PathBuf> {
        self.store_file
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(|f| project_dir.join(f))
    }

    /// Master key material from the configured environment variable.
    ///
    /// `None` when the variable is unset or blank; the store then runs
    /// on an ephemeral key.
    pub fn master_key_material(&self) -> Option<Zeroizing<String>> {
        std::env::var(&self.master_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Zeroizing::new)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> crate::crypto::Argon2Params {
        crate::crypto::Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

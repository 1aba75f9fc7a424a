//! An encrypted, namespaced secret and API key store.
//!
//! Values are sealed with AES-256-GCM under a key derived from one
//! process-wide master key.  Secrets are addressed by `(namespace, key)`
//! and decoded back to their declared type on read; API keys are
//! addressed by id and looked up by name.  Listing operations only ever
//! return safe summaries.
//!
//! ```no_run
//! use keystore::{KeyStore, MasterKey, Value};
//!
//! let store = KeyStore::in_memory(Some(MasterKey::generate()))?;
//! store.set_secret("app", "greeting", "hello", None)?;
//! assert_eq!(store.get_secret("app", "greeting")?, Some(Value::from("hello")));
//! # Ok::<(), keystore::KeyStoreError>(())
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod store;

pub use codec::{Value, ValueType};
pub use crypto::{Cipher, Envelope, MasterKey};
pub use errors::{KeyStoreError, Result};
pub use store::{KeyStore, StoreOptions};

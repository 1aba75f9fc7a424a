//! `keystore get`: decrypt and print a single secret.

use crate::cli::{open_store, Cli};
use crate::errors::{KeyStoreError, Result};

/// Execute the `get` command.
pub fn execute(cli: &Cli, namespace: &str, key: &str) -> Result<()> {
    let store = open_store(cli)?;

    match store.get_secret(namespace, key)? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(KeyStoreError::CommandFailed(format!(
            "no secret '{key}' in namespace '{namespace}'"
        ))),
    }
}

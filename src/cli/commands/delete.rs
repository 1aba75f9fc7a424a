//! `keystore delete`: remove a namespaced secret.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::{KeyStoreError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, namespace: &str, key: &str, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete secret '{namespace}/{key}'?"))
            .default(false)
            .interact()
            .map_err(|e| KeyStoreError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let store = open_store(cli)?;
    let removed = store.delete_secret(namespace, key)?;
    store.close()?;

    if removed {
        output::success(&format!("Deleted secret '{namespace}/{key}'"));
    } else {
        output::info(&format!("No secret '{namespace}/{key}' — nothing to delete."));
    }

    Ok(())
}

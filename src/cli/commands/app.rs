//! `keystore app`: show the application profile.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::{KeyStoreError, Result};

pub fn execute(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let Some(app) = store.app_settings() else {
        output::info("No application profile stored.");
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&app)
        .map_err(|e| KeyStoreError::SerializationError(format!("app settings: {e}")))?;
    println!("{json}");
    Ok(())
}

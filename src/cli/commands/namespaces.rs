//! `keystore namespaces`: list namespaces that hold secrets.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

pub fn execute(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let namespaces = store.list_namespaces();

    if namespaces.is_empty() {
        output::info("No secrets stored yet.");
        return Ok(());
    }
    for ns in namespaces {
        println!("{ns}");
    }
    Ok(())
}

//! `keystore list`: display the secrets of a namespace in a table.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, namespace: &str) -> Result<()> {
    let store = open_store(cli)?;
    let secrets = store.list_secrets(namespace)?;

    output::info(&format!(
        "namespace '{namespace}' — {} secret(s)",
        secrets.len()
    ));
    output::print_secrets_table(namespace, &secrets);

    Ok(())
}

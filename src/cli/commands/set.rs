//! `keystore set`: add or update a namespaced secret.

use crate::cli::output;
use crate::cli::{open_store, parse_metadata, parse_value_type, read_value, Cli};
use crate::codec::Value;
use crate::errors::Result;

/// Execute the `set` command.
pub fn execute(
    cli: &Cli,
    namespace: &str,
    key: &str,
    value: Option<&str>,
    value_type: &str,
    metadata: Option<&str>,
) -> Result<()> {
    // Validate the cheap arguments before prompting for anything.
    let value_type = parse_value_type(value_type)?;
    let metadata = parse_metadata(metadata)?;

    let raw = read_value(value, &format!("Enter value for {namespace}/{key}"))?;
    let typed = Value::parse(value_type, &raw)?;

    let store = open_store(cli)?;
    let summary = store.set_secret(namespace, key, typed, metadata)?;
    store.close()?;

    // A replace keeps created_at and moves updated_at strictly past it.
    let verb = if summary.updated_at > summary.created_at {
        "updated"
    } else {
        "added"
    };
    output::success(&format!(
        "Secret '{}/{}' {verb} ({})",
        summary.namespace, summary.key, summary.value_type
    ));

    Ok(())
}

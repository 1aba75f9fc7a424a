//! `keystore keys ...`: manage API keys.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_store, parse_id, parse_timestamp, read_value, Cli, KeysAction};
use crate::errors::{KeyStoreError, Result};
use crate::store::{ApiKeyUpdate, NewApiKey};

/// Dispatch a `keys` subcommand.
pub fn execute(cli: &Cli, action: &KeysAction) -> Result<()> {
    match action {
        KeysAction::Create {
            name,
            value,
            key_type,
            description,
            expires_at,
            inactive,
        } => create(
            cli,
            name,
            value.as_deref(),
            key_type,
            description.as_deref(),
            expires_at.as_deref(),
            *inactive,
        ),
        KeysAction::List => list(cli),
        KeysAction::Reveal { name } => reveal(cli, name),
        KeysAction::Update {
            id,
            name,
            key_type,
            new_value,
            description,
            clear_description,
            active,
            expires_at,
            clear_expiry,
        } => {
            let expires_at = match (expires_at, clear_expiry) {
                (Some(raw), _) => Some(Some(parse_timestamp(raw)?)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let description = match (description, clear_description) {
                (Some(d), _) => Some(Some(d.clone())),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let value = if *new_value {
                Some(read_value(None, "Enter new value")?.to_string())
            } else {
                None
            };
            let update = ApiKeyUpdate {
                key_name: name.clone(),
                key_type: key_type.clone(),
                value,
                description,
                is_active: *active,
                expires_at,
            };
            update_key(cli, id, update)
        }
        KeysAction::Delete { id, force } => delete(cli, id, *force),
    }
}

fn create(
    cli: &Cli,
    name: &str,
    value: Option<&str>,
    key_type: &str,
    description: Option<&str>,
    expires_at: Option<&str>,
    inactive: bool,
) -> Result<()> {
    let expires_at = expires_at.map(parse_timestamp).transpose()?;
    let value = read_value(value, &format!("Enter value for {name}"))?;

    let mut new_key = NewApiKey::new(name, key_type, &value);
    if let Some(d) = description {
        new_key = new_key.description(d);
    }
    if let Some(at) = expires_at {
        new_key = new_key.expires_at(at);
    }
    if inactive {
        new_key = new_key.inactive();
    }

    let store = open_store(cli)?;
    let created = store.create_api_key(new_key)?;
    store.close()?;

    output::success(&format!(
        "API key '{}' created with id {}",
        created.key_name, created.id
    ));
    output::tip(&format!("Reveal it with: keystore keys reveal {}", created.key_name));
    Ok(())
}

fn list(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let keys = store.list_api_keys();
    output::info(&format!("{} API key(s)", keys.len()));
    output::print_api_keys_table(&keys);
    Ok(())
}

fn reveal(cli: &Cli, name: &str) -> Result<()> {
    let store = open_store(cli)?;
    match store.get_api_key_value(name)? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(KeyStoreError::CommandFailed(format!(
            "no active API key named '{name}'"
        ))),
    }
}

fn update_key(cli: &Cli, id: &str, update: ApiKeyUpdate) -> Result<()> {
    let id = parse_id(id)?;
    let store = open_store(cli)?;
    let updated = store.update_api_key(id, update)?;
    store.close()?;

    match updated {
        Some(key) => {
            output::success(&format!("API key '{}' ({}) updated", key.key_name, key.id));
            Ok(())
        }
        None => Err(KeyStoreError::CommandFailed(format!("no API key with id {id}"))),
    }
}

fn delete(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let id = parse_id(id)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete API key {id}?"))
            .default(false)
            .interact()
            .map_err(|e| KeyStoreError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let store = open_store(cli)?;
    let removed = store.delete_api_key(id)?;
    store.close()?;

    if removed {
        output::success(&format!("Deleted API key {id}"));
    } else {
        output::info(&format!("No API key with id {id} — nothing to delete."));
    }
    Ok(())
}

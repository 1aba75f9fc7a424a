//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::codec::ValueType;
use crate::config::Settings;
use crate::errors::{KeyStoreError, Result};
use crate::store::KeyStore;

/// keystore CLI: encrypted secret and API key store.
#[derive(Parser)]
#[command(
    name = "keystore",
    about = "Encrypted secret and API key store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store file (overrides `store_file` in .keystore.toml)
    #[arg(short, long, global = true, env = "KEYSTORE_FILE")]
    pub store: Option<PathBuf>,

    /// Directory holding .keystore.toml (default: current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Set a namespaced secret (add or update)
    Set {
        /// Namespace (e.g. app, user, system)
        namespace: String,
        /// Secret key within the namespace
        key: String,
        /// Secret value (omit for interactive prompt or stdin)
        value: Option<String>,
        /// Value type: string, number or json
        #[arg(short = 't', long = "type", default_value = "string")]
        value_type: String,
        /// Unencrypted JSON metadata to attach
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Print a secret's decrypted value
    Get {
        namespace: String,
        key: String,
    },

    /// Delete a secret
    Delete {
        namespace: String,
        key: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List the secrets of a namespace (no values)
    List {
        namespace: String,
    },

    /// List namespaces that hold secrets
    Namespaces,

    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Show the application profile
    App,

    /// Generate a random master key (hex)
    GenKey,
}

/// API key subcommands.
#[derive(clap::Subcommand)]
pub enum KeysAction {
    /// Create an API key
    Create {
        /// Key name used for lookup (e.g. openai)
        name: String,
        /// Credential value (omit for interactive prompt or stdin)
        value: Option<String>,
        /// Key type: api_key, secret, token, password, ...
        #[arg(long = "type", default_value = "api_key")]
        key_type: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Expiry timestamp (RFC 3339); informational only
        #[arg(long)]
        expires_at: Option<String>,
        /// Create the key deactivated
        #[arg(long)]
        inactive: bool,
    },

    /// List API keys (no values)
    List,

    /// Print the value of the active key with this name
    Reveal {
        name: String,
    },

    /// Update fields of an API key
    Update {
        /// Key id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        key_type: Option<String>,
        /// Read a new value from a prompt or stdin
        #[arg(long)]
        new_value: bool,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        /// Set the active flag (true/false)
        #[arg(long)]
        active: Option<bool>,
        #[arg(long, conflicts_with = "clear_expiry")]
        expires_at: Option<String>,
        #[arg(long)]
        clear_expiry: bool,
    },

    /// Delete an API key
    Delete {
        /// Key id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the project directory from the CLI arguments.
pub fn project_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

/// Open the file-backed store for a command.
///
/// Unlike the library, the CLI refuses to run on an ephemeral key or
/// without a store file: either would silently lose everything written.
pub fn open_store(cli: &Cli) -> Result<KeyStore> {
    let dir = project_dir(cli)?;
    let settings = Settings::load(&dir)?;

    if cli.store.is_none() && settings.store_path(&dir).is_none() {
        return Err(KeyStoreError::CommandFailed(
            "no store file configured — pass --store <path> or set store_file in .keystore.toml"
                .into(),
        ));
    }
    if settings.master_key_material().is_none() {
        return Err(KeyStoreError::CommandFailed(format!(
            "{} is not set — run `keystore gen-key` and export the result",
            settings.master_key_env
        )));
    }

    KeyStore::from_settings(&settings, &dir, cli.store.as_deref())
}

/// Read a secret value from the argument, piped stdin, or a hidden prompt.
///
/// Returns `Zeroizing<String>` so the value is wiped from memory on drop.
pub fn read_value(inline: Option<&str>, prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(v) = inline {
        output::warning("Value provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(Zeroizing::new(buf.trim_end().to_string()));
    }

    let value = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| KeyStoreError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}

/// Parse a `--type` argument.
pub fn parse_value_type(raw: &str) -> Result<ValueType> {
    raw.parse()
}

/// Parse an API key id argument.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| KeyStoreError::Validation(format!("'{raw}' is not a valid key id: {e}")))
}

/// Parse an RFC 3339 timestamp argument.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KeyStoreError::Validation(format!("'{raw}' is not an RFC 3339 timestamp: {e}")))
}

/// Parse a `--metadata` argument as JSON.
pub fn parse_metadata(raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    raw.map(|m| {
        serde_json::from_str(m)
            .map_err(|e| KeyStoreError::Validation(format!("metadata is not valid JSON: {e}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_set_with_type_and_metadata() {
        let cli = Cli::try_parse_from([
            "keystore", "set", "app", "limits", "{\"max\":5}", "--type", "json", "--metadata",
            "{\"owner\":\"ops\"}",
        ])
        .unwrap();
        match cli.command {
            Commands::Set {
                namespace,
                key,
                value,
                value_type,
                metadata,
            } => {
                assert_eq!(namespace, "app");
                assert_eq!(key, "limits");
                assert_eq!(value.as_deref(), Some("{\"max\":5}"));
                assert_eq!(value_type, "json");
                assert!(metadata.is_some());
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_value_type("number").unwrap(), ValueType::Number);
        assert!(parse_value_type("blob").is_err());

        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(parse_id("not-a-uuid").is_err());

        let ts = parse_timestamp("2030-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2030-01-01T00:00:00+00:00");
        assert!(parse_timestamp("tomorrow").is_err());

        assert_eq!(parse_metadata(None).unwrap(), None);
        assert!(parse_metadata(Some("{bad")).is_err());
    }

    #[test]
    fn description_and_clear_conflict() {
        let result = Cli::try_parse_from([
            "keystore",
            "keys",
            "update",
            "00000000-0000-0000-0000-000000000000",
            "--description",
            "x",
            "--clear-description",
        ]);
        assert!(result.is_err());
    }
}

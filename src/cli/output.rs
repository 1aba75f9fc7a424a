//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::store::{ApiKeySummary, SecretSummary};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Print a table of secret summaries (Key, Type, Metadata, Created, Updated).
pub fn print_secrets_table(namespace: &str, secrets: &[SecretSummary]) {
    if secrets.is_empty() {
        info(&format!("No secrets in namespace '{namespace}' yet."));
        tip(&format!("Run `keystore set {namespace} <KEY>` to add one."));
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Type", "Metadata", "Created", "Updated"]);

    for s in secrets {
        table.add_row(vec![
            s.key.clone(),
            s.value_type.to_string(),
            s.metadata
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_default(),
            timestamp(&s.created_at),
            timestamp(&s.updated_at),
        ]);
    }

    println!("{table}");
}

/// Print a table of API key summaries.  Expired keys are flagged.
pub fn print_api_keys_table(keys: &[ApiKeySummary]) {
    if keys.is_empty() {
        info("No API keys stored yet.");
        tip("Run `keystore keys create <NAME>` to add one.");
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Id",
        "Name",
        "Type",
        "Active",
        "Expires",
        "Description",
        "Updated",
    ]);

    for k in keys {
        let expires = match k.expires_at {
            Some(at) if k.is_expired(now) => format!("{} (expired)", timestamp(&at)),
            Some(at) => timestamp(&at),
            None => "never".to_string(),
        };
        table.add_row(vec![
            k.id.to_string(),
            k.key_name.clone(),
            k.key_type.clone(),
            if k.is_active { "yes" } else { "no" }.to_string(),
            expires,
            k.description.clone().unwrap_or_default(),
            timestamp(&k.updated_at),
        ]);
    }

    println!("{table}");
}

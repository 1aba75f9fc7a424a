//! `keystore gen-key`: print a fresh random master key.

use crate::cli::{output, project_dir, Cli};
use crate::config::Settings;
use crate::crypto::MasterKey;
use crate::errors::Result;

pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load(&project_dir(cli)?)?;

    let key = MasterKey::generate();
    println!("{}", key.to_hex().as_str());
    output::tip(&format!(
        "Export it as {}; losing it makes the store unreadable.",
        settings.master_key_env
    ));
    Ok(())
}

//! `passvault init`: create a new store bound to a GnuPG key.

use crate::cli::output;
use crate::cli::{load_settings, store_root, Cli};
use crate::errors::{PassVaultError, Result};
use crate::vault::Vault;

/// Execute the `init` command.
pub fn execute(cli: &Cli, key_id: &str) -> Result<()> {
    let settings = load_settings(cli)?;
    let root = store_root(cli, &settings);

    match Vault::init(&root, key_id, settings.gpg(), settings.vault_options()) {
        Ok(vault) => {
            output::success(&format!("New store created: {}", vault.root().display()));
            output::tip("Run `passvault add <NAME>` to add an entry.");
            Ok(())
        }
        Err(e @ PassVaultError::StoreExists(_)) => {
            output::tip("Use `passvault list` to see what the existing store holds.");
            Err(e)
        }
        Err(e @ PassVaultError::Encryption(_)) => {
            output::tip("The key must be in your keyring and ultimately trusted.");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

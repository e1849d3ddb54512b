//! `passvault del`: remove an entry from the store.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{load_settings, open_vault, Cli};
use crate::errors::{PassVaultError, Result};

/// Execute the `del` command.
pub fn execute(cli: &Cli, name: &str, group: Option<&str>, yes: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let vault = open_vault(cli, &settings)?;

    // Unless --yes is set, ask for confirmation before deleting.
    if !yes {
        let target = match group {
            Some(group) => format!("{group}/{name}"),
            None => name.to_string(),
        };
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete entry '{target}'?"))
            .default(false)
            .interact()
            .map_err(|e| PassVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let removed = vault.del(group, name)?;
    output::success(&format!("Entry removed: {removed}"));

    Ok(())
}

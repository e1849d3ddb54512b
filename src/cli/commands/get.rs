//! `passvault get`: decrypt an entry and hand out its password.

use crate::cli::output;
use crate::cli::{load_settings, open_vault, Cli};
use crate::clipboard::ClipboardSession;
use crate::errors::{PassVaultError, Result};

/// Execute the `get` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    group: Option<&str>,
    echo: bool,
    silent: bool,
    no_clipboard: bool,
) -> Result<()> {
    let settings = load_settings(cli)?;
    let vault = open_vault(cli, &settings)?;
    let entry = vault.get(group, name)?;

    if !silent {
        output::print_entry(&entry, echo);
    }
    if no_clipboard {
        return Ok(());
    }

    let password = entry.secret_str().ok_or_else(|| {
        PassVaultError::CommandFailed(format!(
            "password of {} is not text and cannot be copied",
            entry.location()
        ))
    })?;

    let clear_after = settings.clipboard_clear_after();
    let mut clipboard = ClipboardSession::system()?;
    clipboard.copy(password, clear_after)?;
    if !silent && !echo {
        output::info(&format!(
            "Password copied to clipboard (will be cleared in {}s)",
            clear_after.as_secs()
        ));
    }

    // Keep the process (and with it the clipboard contents) alive until the
    // clear has run.
    clipboard.wait();
    Ok(())
}

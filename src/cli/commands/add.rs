//! `passvault add`: encrypt and store a new entry.

use crate::cli::output;
use crate::cli::{load_settings, open_vault, password_policy, prompt_new_secret, Cli};
use crate::clipboard::ClipboardSession;
use crate::errors::Result;
use crate::vault::{EntryFields, SecretSource};

/// Options of the `add` command, as parsed by clap.
pub struct AddArgs<'a> {
    pub name: &'a str,
    pub group: Option<&'a str>,
    pub username: Option<&'a str>,
    pub uri: Option<&'a str>,
    pub comment: Option<&'a str>,
    pub generate: bool,
    pub length: Option<usize>,
    pub classes: Option<&'a str>,
}

/// Execute the `add` command.
pub fn execute(cli: &Cli, args: &AddArgs<'_>) -> Result<()> {
    let settings = load_settings(cli)?;
    let vault = open_vault(cli, &settings)?;

    let fields = EntryFields {
        username: args.username.map(str::to_string),
        uri: args.uri.map(str::to_string),
        comment: args.comment.map(str::to_string),
    };

    // Either generate a password or ask for one.
    let source = if args.generate {
        SecretSource::Generate(password_policy(&settings, args.length, args.classes)?)
    } else {
        let secret = prompt_new_secret()?;
        SecretSource::provided(secret.as_bytes())
    };

    let entry = vault.add(args.group, args.name, fields, source)?;
    output::success(&format!("Entry added: {}", entry.location()));

    if args.generate {
        let Some(password) = entry.secret_str() else {
            return Ok(());
        };
        let clear_after = settings.clipboard_clear_after();
        let mut clipboard = ClipboardSession::system()?;
        clipboard.copy(password, clear_after)?;
        output::info(&format!(
            "Password copied to clipboard (will be cleared in {}s)",
            clear_after.as_secs()
        ));
        clipboard.wait();
    }

    Ok(())
}

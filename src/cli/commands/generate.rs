//! `passvault generate`: print a random password without storing it.

use crate::cli::{load_settings, password_policy, Cli};
use crate::errors::Result;
use crate::generator;

/// Execute the `generate` command.
pub fn execute(cli: &Cli, length: Option<usize>, classes: Option<&str>) -> Result<()> {
    let settings = load_settings(cli)?;
    let policy = password_policy(&settings, length, classes)?;
    let password = generator::generate(&policy)?;
    println!("{}", password.as_str());
    Ok(())
}

//! `passvault list`: show groups and entry names as a tree.

use crate::cli::output;
use crate::cli::{group_filter, load_settings, open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
///
/// With `lenient`, requested groups that do not exist are reported as
/// warnings and the rest is listed.
pub fn execute(cli: &Cli, groups: &[String], lenient: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let vault = open_vault(cli, &settings)?;

    let filter = group_filter(groups);
    let listing = if lenient {
        vault.list_lenient(filter.as_ref())?
    } else {
        vault.list(filter.as_ref())?
    };

    if let Some(wanted) = &filter {
        for missing in wanted
            .iter()
            .filter(|g| !listing.iter().any(|found| &found.name == *g))
        {
            output::warning(&format!("Group '{missing}' not found"));
        }
    }
    output::print_tree(vault.root(), &listing);

    Ok(())
}

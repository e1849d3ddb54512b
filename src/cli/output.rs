//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{Entry, GroupListing};

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

/// Render the store as a tree, one line per group and entry.
///
/// ```text
/// /home/alice/.passvault-store
/// ├── default
/// │   └── github
/// └── work
///     ├── mail
///     └── vpn
/// ```
pub fn render_tree(root: &Path, groups: &[GroupListing]) -> String {
    let mut out = format!("{}\n", root.display());
    for (gi, group) in groups.iter().enumerate() {
        let last_group = gi + 1 == groups.len();
        out.push_str(&format!(
            "{}── {}\n",
            if last_group { '└' } else { '├' },
            group.name
        ));
        for (ei, entry) in group.entries.iter().enumerate() {
            let last_entry = ei + 1 == group.entries.len();
            out.push_str(&format!(
                "{}   {}── {}\n",
                if last_group { ' ' } else { '│' },
                if last_entry { '└' } else { '├' },
                entry
            ));
        }
    }
    out
}

/// Print the store tree, or a hint when it is empty.
pub fn print_tree(root: &Path, groups: &[GroupListing]) {
    print!("{}", render_tree(root, groups));
    if groups.is_empty() {
        tip("Run `passvault add <NAME>` to add your first entry.");
    }
}

/// Print an entry's fields as a table; the password only if `show_secret`.
pub fn print_entry(entry: &Entry, show_secret: bool) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field".to_string(), entry.location().to_string()]);

    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    table.add_row(vec!["URI".to_string(), field(&entry.uri)]);
    table.add_row(vec!["Username".to_string(), field(&entry.username)]);
    table.add_row(vec!["Comment".to_string(), field(&entry.comment)]);
    if show_secret {
        let secret = match entry.secret_str() {
            Some(text) => text.to_string(),
            None => String::from_utf8_lossy(&entry.secret).into_owned(),
        };
        table.add_row(vec!["Password".to_string(), secret]);
    }

    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, entries: &[&str]) -> GroupListing {
        GroupListing {
            name: name.to_string(),
            entries: entries.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn tree_uses_box_drawing_like_a_file_tree() {
        let groups = vec![listing("default", &["github"]), listing("work", &["mail", "vpn"])];
        let rendered = render_tree(Path::new("/store"), &groups);
        assert_eq!(
            rendered,
            "/store\n\
             ├── default\n\
             │   └── github\n\
             └── work\n\
             \u{20}   ├── mail\n\
             \u{20}   └── vpn\n"
        );
    }

    #[test]
    fn empty_tree_prints_only_root() {
        assert_eq!(render_tree(Path::new("/store"), &[]), "/store\n");
    }
}

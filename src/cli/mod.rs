//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::collections::BTreeSet;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{PassVaultError, Result};
use crate::generator::PasswordPolicy;
use crate::vault::Vault;

/// PassVault CLI: command-line password manager.
#[derive(Parser)]
#[command(
    name = "passvault",
    about = "Command-line password manager backed by GnuPG",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store location (overrides the config file)
    #[arg(short, long, global = true, env = "PASSVAULT_DIR")]
    pub dir: Option<PathBuf>,

    /// Config file (default: ~/.config/passvault/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Initialize the password store
    Init {
        /// ID of the key used for encrypting the store
        key_id: String,
    },

    /// Add a new entry
    Add {
        /// Entry name
        name: String,

        /// Group the entry belongs to (default from config)
        #[arg(short, long)]
        group: Option<String>,

        /// User name
        #[arg(short = 'u', long = "user")]
        username: Option<String>,

        /// Resource URI
        #[arg(short = 'U', long)]
        uri: Option<String>,

        /// Additional entry information
        #[arg(short, long)]
        comment: Option<String>,

        /// Generate a random password instead of prompting for one
        #[arg(long)]
        generate: bool,

        /// Length of the generated password
        #[arg(long, requires = "generate")]
        length: Option<usize>,

        /// Character classes of the generated password (e.g. lower,digit)
        #[arg(long, requires = "generate")]
        classes: Option<String>,
    },

    /// Fetch an entry from the store
    Get {
        /// Entry name
        name: String,

        /// Group the entry belongs to (searched everywhere if omitted)
        #[arg(short, long)]
        group: Option<String>,

        /// Display the password
        #[arg(short, long)]
        echo: bool,

        /// Do not output anything
        #[arg(short, long)]
        silent: bool,

        /// Do not copy the password to the clipboard
        #[arg(long)]
        no_clipboard: bool,
    },

    /// Delete an entry
    Del {
        /// Entry name
        name: String,

        /// Group the entry belongs to (searched everywhere if omitted)
        #[arg(short, long)]
        group: Option<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List store entries
    List {
        /// Display only entries from these groups
        #[arg(short = 'G', long = "groups", num_args = 1..)]
        groups: Vec<String>,

        /// Skip requested groups that do not exist instead of failing
        #[arg(long, requires = "groups")]
        lenient: bool,
    },

    /// Print a random password
    Generate {
        /// Password length (default from config)
        #[arg(long)]
        length: Option<usize>,

        /// Character classes to use (default: all)
        #[arg(long)]
        classes: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum, ignore_case = true)]
        shell: Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load the settings selected by `--config` / `$PASSVAULT_CONFIG`.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::discover(cli.config.as_deref())
}

/// The store root: `--dir` if given, otherwise the configured one.
pub fn store_root(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.dir.clone().unwrap_or_else(|| settings.store_path())
}

/// Open the store selected by the CLI arguments.
pub fn open_vault(cli: &Cli, settings: &Settings) -> Result<Vault> {
    Vault::open(
        &store_root(cli, settings),
        settings.gpg(),
        settings.vault_options(),
    )
}

/// Build a generation policy from CLI flags, falling back to settings.
pub fn password_policy(
    settings: &Settings,
    length: Option<usize>,
    classes: Option<&str>,
) -> Result<PasswordPolicy> {
    let mut policy = settings.password_policy();
    if let Some(length) = length {
        policy.length = length;
    }
    if let Some(classes) = classes {
        policy.classes = PasswordPolicy::parse_classes(classes)?;
    }
    policy.validate()?;
    Ok(policy)
}

/// Turn repeated `-G` values into a group filter (`None` means all).
pub fn group_filter(groups: &[String]) -> Option<BTreeSet<String>> {
    if groups.is_empty() {
        None
    } else {
        Some(groups.iter().cloned().collect())
    }
}

/// Read a new entry password.
///
/// Piped stdin supplies the first line as-is.  On a terminal the user is
/// prompted twice until both inputs match.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_new_secret() -> Result<Zeroizing<String>> {
    let secret = if !io::stdin().is_terminal() {
        let mut line = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut line)?;
        Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string())
    } else {
        let pw = dialoguer::Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match!")
            .interact()
            .map_err(|e| PassVaultError::CommandFailed(format!("password prompt: {e}")))?;
        Zeroizing::new(pw)
    };

    if secret.is_empty() {
        return Err(PassVaultError::CommandFailed(
            "password cannot be empty".into(),
        ));
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CharClass;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_generation_options() {
        let cli = Cli::try_parse_from([
            "passvault", "-d", "/tmp/store", "add", "github", "-g", "work", "-u", "alice",
            "--generate", "--length", "12", "--classes", "lower,digit",
        ])
        .unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/store")));
        match cli.command {
            Commands::Add {
                name,
                group,
                username,
                generate,
                length,
                classes,
                ..
            } => {
                assert_eq!(name, "github");
                assert_eq!(group.as_deref(), Some("work"));
                assert_eq!(username.as_deref(), Some("alice"));
                assert!(generate);
                assert_eq!(length, Some(12));
                assert_eq!(classes.as_deref(), Some("lower,digit"));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn length_requires_generate() {
        assert!(Cli::try_parse_from(["passvault", "add", "x", "--length", "8"]).is_err());
    }

    #[test]
    fn list_accepts_several_groups() {
        let cli = Cli::try_parse_from(["passvault", "list", "-G", "work", "home"]).unwrap();
        match cli.command {
            Commands::List { groups, lenient } => {
                assert_eq!(groups, vec!["work", "home"]);
                assert!(!lenient);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn completions_take_a_known_shell() {
        let cli = Cli::try_parse_from(["passvault", "completions", "ZSH"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Zsh }
        ));
        assert!(Cli::try_parse_from(["passvault", "completions", "csh"]).is_err());
    }

    #[test]
    fn lenient_list_needs_groups() {
        let cli =
            Cli::try_parse_from(["passvault", "list", "--lenient", "-G", "work"]).unwrap();
        assert!(matches!(cli.command, Commands::List { lenient: true, .. }));
        assert!(Cli::try_parse_from(["passvault", "list", "--lenient"]).is_err());
    }

    #[test]
    fn group_filter_empty_means_all() {
        assert!(group_filter(&[]).is_none());
        let filter = group_filter(&["b".into(), "a".into(), "a".into()]).unwrap();
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn policy_flags_override_settings() {
        let settings = Settings {
            password_length: 30,
            ..Settings::default()
        };
        let policy = password_policy(&settings, None, None).unwrap();
        assert_eq!(policy.length, 30);
        assert_eq!(policy.classes.len(), 4);

        let policy = password_policy(&settings, Some(8), Some("digit")).unwrap();
        assert_eq!(policy.length, 8);
        assert_eq!(policy.classes, [CharClass::Digit].into_iter().collect());
    }

    #[test]
    fn invalid_policy_flags_are_rejected() {
        let settings = Settings::default();
        assert!(password_policy(&settings, Some(0), None).is_err());
        assert!(password_policy(&settings, Some(2), None).is_err());
        assert!(password_policy(&settings, None, Some("emoji")).is_err());
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::GpgCli;
use crate::errors::{PassVaultError, Result};
use crate::generator::{PasswordPolicy, DEFAULT_LENGTH};
use crate::vault::VaultOptions;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PASSVAULT_CONFIG";

/// User-level configuration, loaded from `~/.config/passvault/config.toml`.
///
/// Every field has a sensible default so PassVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Store root.  A leading `~/` is expanded against `$HOME`.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Group used when a command does not name one.
    #[serde(default = "default_group")]
    pub default_group: String,

    /// Seconds before a copied secret is wiped from the clipboard.
    #[serde(default = "default_clipboard_clear_secs")]
    pub clipboard_clear_secs: u64,

    /// Longest wait for the store lock, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Length of generated passwords.
    #[serde(default = "default_password_length")]
    pub password_length: usize,

    /// The gpg executable to run.
    #[serde(default = "default_gpg_program")]
    pub gpg_program: String,

    /// Alternative GnuPG home directory.
    #[serde(default)]
    pub gpg_homedir: Option<String>,

    /// Store entries ASCII-armored.
    #[serde(default = "default_armor")]
    pub armor: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_dir() -> String {
    "~/.passvault-store".to_string()
}

fn default_group() -> String {
    crate::vault::DEFAULT_GROUP.to_string()
}

fn default_clipboard_clear_secs() -> u64 {
    30
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_password_length() -> usize {
    DEFAULT_LENGTH
}

fn default_gpg_program() -> String {
    "gpg".to_string()
}

fn default_armor() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            default_group: default_group(),
            clipboard_clear_secs: default_clipboard_clear_secs(),
            lock_timeout_ms: default_lock_timeout_ms(),
            password_length: default_password_length(),
            gpg_program: default_gpg_program(),
            gpg_homedir: None,
            armor: default_armor(),
        }
    }
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PassVaultError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        if settings.default_group.trim().is_empty() {
            return Err(PassVaultError::Config(format!(
                "{}: default_group cannot be empty",
                path.display()
            )));
        }

        Ok(settings)
    }

    /// Load settings from the first location that applies:
    /// `explicit`, then `$PASSVAULT_CONFIG`, then the per-user default.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match Self::config_path(explicit) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Resolve which config file would be read.
    pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        home_dir().map(|home| home.join(".config").join("passvault").join("config.toml"))
    }

    /// The store root with `~/` expanded.
    pub fn store_path(&self) -> PathBuf {
        expand_home(&self.store_dir)
    }

    /// Vault options derived from these settings.
    pub fn vault_options(&self) -> VaultOptions {
        VaultOptions {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            default_group: self.default_group.clone(),
        }
    }

    /// The gpg capability described by these settings.
    pub fn gpg(&self) -> GpgCli {
        let gpg = GpgCli::new(&self.gpg_program).with_armor(self.armor);
        match &self.gpg_homedir {
            Some(homedir) => gpg.with_homedir(expand_home(homedir)),
            None => gpg,
        }
    }

    pub fn clipboard_clear_after(&self) -> Duration {
        Duration::from_secs(self.clipboard_clear_secs)
    }

    /// Generation policy with the configured length and every class.
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            length: self.password_length,
            ..PasswordPolicy::default()
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// Expand a leading `~` or `~/` against `$HOME`.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), home_dir()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

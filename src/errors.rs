use std::path::PathBuf;
use thiserror::Error;

use crate::crypto::CapabilityError;

/// All errors that can occur in PassVault.
#[derive(Debug, Error)]
pub enum PassVaultError {
    // --- Store errors ---
    #[error("Store already exists at {0}")]
    StoreExists(PathBuf),

    #[error("Store is corrupt: {0}")]
    StoreCorrupt(String),

    #[error("Could not lock store at {0}: another passvault process is using it")]
    LockContention(PathBuf),

    // --- Namespace errors ---
    #[error("No such entry: {0}")]
    NotFound(String),

    #[error("Entry already exists: {group}/{name}")]
    DuplicateEntry { group: String, name: String },

    #[error("Entry '{name}' exists in several groups ({}); specify a group", .groups.join(", "))]
    AmbiguousEntry { name: String, groups: Vec<String> },

    #[error("No such group: {0}")]
    UnknownGroup(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    Encryption(CapabilityError),

    #[error("Decryption failed: {0}")]
    Decryption(CapabilityError),

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    // --- Generator errors ---
    #[error("Invalid password policy: {0}")]
    InvalidPolicy(String),

    // --- Clipboard errors ---
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for PassVault results.
pub type Result<T> = std::result::Result<T, PassVaultError>;

//! Validation of group and entry names.
//!
//! Both kinds of names become path segments on disk, so they must be a
//! single, ordinary file name.  Names starting with `.` are reserved for
//! the store's own files (the metadata record and in-flight temp files).

use crate::errors::{PassVaultError, Result};

/// Longest name accepted.
///
/// Entries are written through a `.<name>.tmp` sibling, and that temp name
/// must still fit the common 255-byte file-name limit.
pub const MAX_NAME_LEN: usize = 250;

/// Check that `name` can be used as a group name.
pub fn validate_group_name(name: &str) -> Result<()> {
    validate("group", name)
}

/// Check that `name` can be used as an entry name.
pub fn validate_entry_name(name: &str) -> Result<()> {
    validate("entry", name)
}

/// Whether a directory entry on disk is store-internal (never a group or entry).
pub(crate) fn is_reserved(file_name: &str) -> bool {
    file_name.starts_with('.')
}

fn validate(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PassVaultError::InvalidName(format!(
            "{kind} name cannot be empty"
        )));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(PassVaultError::InvalidName(format!(
            "{kind} name cannot exceed {MAX_NAME_LEN} bytes"
        )));
    }
    if name == "." || name == ".." {
        return Err(PassVaultError::InvalidName(format!(
            "'{name}' is not a valid {kind} name"
        )));
    }
    if is_reserved(name) {
        return Err(PassVaultError::InvalidName(format!(
            "{kind} name '{name}' cannot start with '.'"
        )));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c == '\0') {
        return Err(PassVaultError::InvalidName(format!(
            "{kind} name '{name}' cannot contain path separators"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(PassVaultError::InvalidName(format!(
            "{kind} name cannot contain control characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_entry_name("github").is_ok());
        assert!(validate_entry_name("mail.example.com").is_ok());
        assert!(validate_entry_name("bank account").is_ok());
        assert!(validate_group_name("default").is_ok());
        assert!(validate_group_name("work-2024").is_ok());
    }

    #[test]
    fn rejects_empty_and_relative_names() {
        assert!(validate_entry_name("").is_err());
        assert!(validate_entry_name(".").is_err());
        assert!(validate_group_name("..").is_err());
    }

    #[test]
    fn rejects_separators() {
        assert!(validate_entry_name("a/b").is_err());
        assert!(validate_entry_name("a\\b").is_err());
        assert!(validate_group_name("../etc").is_err());
        assert!(validate_entry_name("nul\0byte").is_err());
    }

    #[test]
    fn rejects_reserved_dot_names() {
        assert!(validate_entry_name(".passvault.json").is_err());
        assert!(validate_group_name(".hidden").is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        assert!(validate_entry_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_entry_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(validate_entry_name("line\nbreak").is_err());
    }
}

//! Entry value types.
//!
//! An [`Entry`] is an immutable snapshot of one decrypted record.  It
//! wipes its memory when dropped and never prints its secret through
//! `Debug`.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Location of an entry inside a store: `<group>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryRef {
    pub group: String,
    pub name: String,
}

impl EntryRef {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

/// Optional descriptive fields supplied when adding an entry.
///
/// `None` means "not set"; `Some(String::new())` is a deliberately empty
/// value and survives encryption as such.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    pub username: Option<String>,
    pub uri: Option<String>,
    pub comment: Option<String>,
}

/// A decrypted vault entry.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Entry {
    /// Group the entry lives in.
    pub group: String,

    /// Entry name, unique within its group.
    pub name: String,

    pub username: Option<String>,
    pub uri: Option<String>,
    pub comment: Option<String>,

    /// The password itself, as opaque bytes.
    pub secret: Vec<u8>,
}

impl Entry {
    /// Assemble an entry from its location, fields and secret.
    pub fn new(location: &EntryRef, fields: EntryFields, secret: Vec<u8>) -> Self {
        Self {
            group: location.group.clone(),
            name: location.name.clone(),
            username: fields.username,
            uri: fields.uri,
            comment: fields.comment,
            secret,
        }
    }

    pub fn location(&self) -> EntryRef {
        EntryRef::new(self.group.clone(), self.name.clone())
    }

    /// The secret as text, if it is valid UTF-8.
    pub fn secret_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.secret).ok()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("uri", &self.uri)
            .field("comment", &self.comment)
            .field("secret", &"<redacted>")
            .finish()
    }
}

//! Canonical plaintext encoding of an entry and its encryption.
//!
//! The plaintext handed to the key capability is a JSON object with a
//! fixed field order:
//!
//! ```text
//! {"version":1,"username":"..","uri":"..","comment":"..","secret":"<base64>"}
//! ```
//!
//! Optional fields that are not set are left out entirely, so an empty
//! string and an absent value never collapse into each other.  Unknown
//! fields are ignored on read; a `version` newer than this build
//! understands is rejected.
//!
//! The entry's group and name are not part of the document: they are
//! its location in the store and come from the path.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::entry::{Entry, EntryRef};
use super::format::{base64_decode, base64_encode};
use crate::crypto::KeyCapability;
use crate::errors::{PassVaultError, Result};

/// Version written into every new entry document.
pub const ENTRY_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct EntryDocument {
    version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    secret: Vec<u8>,
}

/// Serialize `entry` into its canonical plaintext form.
pub fn encode(entry: &Entry) -> Result<Zeroizing<Vec<u8>>> {
    let document = EntryDocument {
        version: ENTRY_VERSION,
        username: entry.username.clone(),
        uri: entry.uri.clone(),
        comment: entry.comment.clone(),
        secret: entry.secret.clone(),
    };

    serde_json::to_vec(&document)
        .map(Zeroizing::new)
        .map_err(|e| PassVaultError::Serialization(format!("entry document: {}", describe(&e))))
}

/// Parse a canonical plaintext document into the entry stored at `location`.
pub fn decode(location: &EntryRef, plaintext: &[u8]) -> Result<Entry> {
    let mut document: EntryDocument = serde_json::from_slice(plaintext)
        .map_err(|e| PassVaultError::MalformedEntry(format!("{location}: {}", describe(&e))))?;

    if document.version == 0 || document.version > ENTRY_VERSION {
        return Err(PassVaultError::MalformedEntry(format!(
            "{location}: unsupported entry version {}, expected {ENTRY_VERSION}",
            document.version
        )));
    }

    Ok(Entry {
        group: location.group.clone(),
        name: location.name.clone(),
        username: document.username.take(),
        uri: document.uri.take(),
        comment: document.comment.take(),
        secret: std::mem::take(&mut document.secret),
    })
}

/// Describe a JSON error without echoing any of the input.
///
/// serde_json messages can quote the offending value, which here would
/// be decrypted plaintext.
fn describe(e: &serde_json::Error) -> String {
    format!(
        "invalid entry document ({:?} error at line {}, column {})",
        e.classify(),
        e.line(),
        e.column()
    )
}

/// Encrypts and decrypts entries through a [`KeyCapability`].
pub struct EntryCodec<'a> {
    capability: &'a dyn KeyCapability,
}

impl<'a> EntryCodec<'a> {
    pub fn new(capability: &'a dyn KeyCapability) -> Self {
        Self { capability }
    }

    /// Produce the envelope bytes to persist for `entry`.
    pub fn encrypt(&self, key_id: &str, entry: &Entry) -> Result<Vec<u8>> {
        let plaintext = encode(entry)?;
        self.capability
            .encrypt(key_id, &plaintext)
            .map_err(PassVaultError::Encryption)
    }

    /// Open an envelope read from `location`.
    pub fn decrypt(&self, location: &EntryRef, envelope: &[u8]) -> Result<Entry> {
        let plaintext = self
            .capability
            .decrypt(envelope)
            .map_err(PassVaultError::Decryption)?;
        decode(location, &plaintext)
    }
}

//! Public-key encryption capability used to seal vault entries.
//!
//! PassVault does not implement any public-key cryptography itself.
//! Every entry is sealed and opened through a [`KeyCapability`], an
//! injectable trait object with two operations:
//!
//! - `encrypt(key_id, plaintext)`: seal bytes for the given key identity.
//! - `decrypt(ciphertext)`: open bytes; the capability figures out which
//!   private key is required from the ciphertext itself.
//!
//! The production implementation drives the `gpg` executable ([`GpgCli`]).
//! Tests substitute an in-process double.

pub mod gpg;

use std::sync::Arc;

use thiserror::Error;
use zeroize::Zeroizing;

pub use gpg::GpgCli;

/// Failures reported by a [`KeyCapability`].
///
/// The variants are deliberately coarse: callers only need to tell
/// "this key cannot be used" apart from "this data cannot be opened".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("key '{0}' is not trusted or not usable")]
    UntrustedKey(String),

    #[error("no private key available for this data")]
    NoPrivateKey,

    #[error("corrupted or unrecognized input: {0}")]
    Corrupted(String),

    #[error("encryption backend unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),
}

/// Result alias for capability calls.
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// An asymmetric encryption backend.
///
/// Implementations must treat plaintext as sensitive: it is handed in
/// by reference and returned wrapped in [`Zeroizing`] so the caller's
/// buffer is wiped on drop.
pub trait KeyCapability: Send + Sync {
    /// Seal `plaintext` for `key_id`. The output is opaque to the vault.
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> CapabilityResult<Vec<u8>>;

    /// Open bytes previously produced by [`KeyCapability::encrypt`].
    fn decrypt(&self, ciphertext: &[u8]) -> CapabilityResult<Zeroizing<Vec<u8>>>;

    /// Check that `key_id` can be used to seal new entries.
    ///
    /// Called once by `Vault::init` before anything is written.
    fn validate_key(&self, key_id: &str) -> CapabilityResult<()>;
}

impl<C: KeyCapability + ?Sized> KeyCapability for Arc<C> {
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> CapabilityResult<Vec<u8>> {
        (**self).encrypt(key_id, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> CapabilityResult<Zeroizing<Vec<u8>>> {
        (**self).decrypt(ciphertext)
    }

    fn validate_key(&self, key_id: &str) -> CapabilityResult<()> {
        (**self).validate_key(key_id)
    }
}

impl<C: KeyCapability + ?Sized> KeyCapability for Box<C> {
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> CapabilityResult<Vec<u8>> {
        (**self).encrypt(key_id, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> CapabilityResult<Zeroizing<Vec<u8>>> {
        (**self).decrypt(ciphertext)
    }

    fn validate_key(&self, key_id: &str) -> CapabilityResult<()> {
        (**self).validate_key(key_id)
    }
}

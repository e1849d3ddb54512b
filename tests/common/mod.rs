//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use passvault::crypto::{CapabilityError, CapabilityResult, KeyCapability};
use passvault::vault::{Vault, VaultOptions};
use tempfile::TempDir;
use zeroize::Zeroizing;

pub const KEY_ID: &str = "0xA1B2C3D4";

const MAGIC: &[u8] = b"FAKEPGP\n";

/// In-process stand-in for gpg.
///
/// Ciphertext is `FAKEPGP\n<key id>\n<plaintext xor 0x5a>`, so it never
/// contains the plaintext verbatim and carries the recipient like a real
/// OpenPGP message does.
#[derive(Debug)]
pub struct FakeCapability {
    public_keys: Vec<String>,
    private_keys: Vec<String>,
    fail_encrypt: AtomicBool,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl FakeCapability {
    /// Holds the public and private half of `KEY_ID`.
    pub fn new() -> Self {
        Self::with_keys(&[KEY_ID], &[KEY_ID])
    }

    pub fn with_keys(public: &[&str], private: &[&str]) -> Self {
        Self {
            public_keys: public.iter().map(|k| k.to_string()).collect(),
            private_keys: private.iter().map(|k| k.to_string()).collect(),
            fail_encrypt: AtomicBool::new(false),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
        }
    }

    /// Knows no keys at all.
    pub fn empty() -> Self {
        Self::with_keys(&[], &[])
    }

    pub fn set_fail_encrypt(&self, fail: bool) {
        self.fail_encrypt.store(fail, Ordering::SeqCst);
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    /// Seal `plaintext` the way `encrypt` does, bypassing key checks.
    pub fn seal(key_id: &str, plaintext: &[u8]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(key_id.as_bytes());
        out.push(b'\n');
        out.extend(plaintext.iter().map(|b| b ^ 0x5a));
        out
    }
}

impl KeyCapability for FakeCapability {
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> CapabilityResult<Vec<u8>> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(CapabilityError::Failed("injected failure".into()));
        }
        if !self.public_keys.iter().any(|k| k == key_id) {
            return Err(CapabilityError::UnknownKey(key_id.to_string()));
        }
        Ok(Self::seal(key_id, plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> CapabilityResult<Zeroizing<Vec<u8>>> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        let body = ciphertext
            .strip_prefix(MAGIC)
            .ok_or_else(|| CapabilityError::Corrupted("not a fake message".into()))?;
        let split = body
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| CapabilityError::Corrupted("missing recipient".into()))?;
        let recipient = String::from_utf8_lossy(&body[..split]);
        if !self.private_keys.iter().any(|k| *k == recipient) {
            return Err(CapabilityError::NoPrivateKey);
        }
        Ok(Zeroizing::new(
            body[split + 1..].iter().map(|b| b ^ 0x5a).collect(),
        ))
    }

    fn validate_key(&self, key_id: &str) -> CapabilityResult<()> {
        if self.public_keys.iter().any(|k| k == key_id) {
            Ok(())
        } else {
            Err(CapabilityError::UnknownKey(key_id.to_string()))
        }
    }
}

/// Options with a short lock timeout so contention tests finish quickly.
pub fn fast_options() -> VaultOptions {
    VaultOptions {
        lock_timeout: Duration::from_millis(200),
        ..VaultOptions::default()
    }
}

/// A fresh, initialized store in a temp dir, plus a handle on its capability.
pub fn new_store() -> (TempDir, Vault, Arc<FakeCapability>) {
    let dir = TempDir::new().expect("create temp dir");
    let capability = Arc::new(FakeCapability::new());
    let vault = Vault::init(
        &store_root(dir.path()),
        KEY_ID,
        Arc::clone(&capability),
        fast_options(),
    )
    .expect("init store");
    (dir, vault, capability)
}

pub fn store_root(dir: &Path) -> PathBuf {
    dir.join("store")
}

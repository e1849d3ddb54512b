//! High-level vault operations used by CLI commands.
//!
//! `Vault` is the only type that changes what is on disk.  Each
//! operation runs start to finish under a lock on the store root:
//!
//! 1. take the lock (exclusive for `init`/`add`/`del`, shared otherwise),
//! 2. rebuild the [`GroupTree`] from the directory listing,
//! 3. do the work,
//! 4. release the lock when the guard drops, whatever the outcome.
//!
//! Nothing is cached between operations, so several short-lived
//! processes can safely work on the same store.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use zeroize::Zeroizing;

use crate::crypto::{CapabilityError, KeyCapability};
use crate::errors::{PassVaultError, Result};
use crate::generator::{self, PasswordPolicy};

use super::codec::EntryCodec;
use super::entry::{Entry, EntryFields, EntryRef};
use super::format::{self, StoreMetadata, ENTRY_MODE};
use super::lock::{LockMode, StoreLock};
use super::names::{validate_entry_name, validate_group_name};
use super::tree::{GroupListing, GroupTree};

/// Group used by `add` when the caller does not name one.
pub const DEFAULT_GROUP: &str = "default";

/// Default bound on waiting for the store lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for a [`Vault`] handle.
#[derive(Debug, Clone)]
pub struct VaultOptions {
    /// Longest time an operation waits for the store lock.
    pub lock_timeout: Duration,

    /// Group `add` uses when none is given.
    pub default_group: String,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            default_group: DEFAULT_GROUP.to_string(),
        }
    }
}

/// Where the secret of a new entry comes from.
///
/// The caller decides before calling [`Vault::add`]: either it already
/// has the secret (typed and confirmed by the user, piped in, ...) or it
/// asks the vault to generate one under a policy.
pub enum SecretSource {
    Provided(Zeroizing<Vec<u8>>),
    Generate(PasswordPolicy),
}

impl SecretSource {
    pub fn provided(secret: impl Into<Vec<u8>>) -> Self {
        SecretSource::Provided(Zeroizing::new(secret.into()))
    }
}

/// Handle on a store directory.
pub struct Vault {
    root: PathBuf,
    capability: Box<dyn KeyCapability>,
    options: VaultOptions,
}

impl Vault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a brand-new store at `root`, bound to `key_id`.
    ///
    /// The key is checked with the capability before anything touches
    /// the disk.  `root` must not exist yet; its parent must.  If writing
    /// the metadata record fails, the half-created root is removed again.
    pub fn init(
        root: &Path,
        key_id: &str,
        capability: impl KeyCapability + 'static,
        options: VaultOptions,
    ) -> Result<Self> {
        let key_id = key_id.trim();
        if key_id.is_empty() {
            return Err(PassVaultError::Encryption(CapabilityError::UnknownKey(
                String::new(),
            )));
        }
        if fs::symlink_metadata(root).is_ok() {
            return Err(PassVaultError::StoreExists(root.to_path_buf()));
        }

        capability
            .validate_key(key_id)
            .map_err(PassVaultError::Encryption)?;

        match format::create_private_dir(root) {
            Ok(()) => {}
            Err(PassVaultError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PassVaultError::StoreExists(root.to_path_buf()));
            }
            Err(e) => return Err(e),
        }

        let populate = || -> Result<()> {
            let _lock = StoreLock::acquire(root, LockMode::Exclusive, options.lock_timeout)?;
            format::write_metadata(root, &StoreMetadata::new(key_id))
        };
        if let Err(e) = populate() {
            let _ = fs::remove_dir_all(root);
            return Err(e);
        }

        debug!("initialized store at {} for key {key_id}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            capability: Box::new(capability),
            options,
        })
    }

    /// Open an existing store.
    pub fn open(
        root: &Path,
        capability: impl KeyCapability + 'static,
        options: VaultOptions,
    ) -> Result<Self> {
        format::read_metadata(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            capability: Box::new(capability),
            options,
        })
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Encrypt and store a new entry.
    ///
    /// `group` defaults to the configured default group.  Fails with
    /// `DuplicateEntry` if the name is taken in that group; the existing
    /// file is not touched.  Returns the stored entry, which carries the
    /// secret when it was generated here.
    pub fn add(
        &self,
        group: Option<&str>,
        name: &str,
        fields: EntryFields,
        source: SecretSource,
    ) -> Result<Entry> {
        let group = group.unwrap_or(&self.options.default_group);
        validate_group_name(group)?;
        validate_entry_name(name)?;
        if let SecretSource::Generate(ref policy) = source {
            policy.validate()?;
        }

        let _lock = self.lock(LockMode::Exclusive)?;
        let metadata = format::read_metadata(&self.root)?;
        let tree = GroupTree::build(&self.root)?;
        tree.assert_absent(group, name)?;

        let mut secret = match source {
            SecretSource::Provided(secret) => secret,
            SecretSource::Generate(policy) => {
                let password = generator::generate(&policy)?;
                Zeroizing::new(password.as_bytes().to_vec())
            }
        };
        let location = EntryRef::new(group, name);
        let entry = Entry::new(&location, fields, std::mem::take(&mut *secret));

        let envelope = self.codec().encrypt(&metadata.key_id, &entry)?;

        let group_dir = self.root.join(group);
        let created_group = !group_dir.is_dir();
        if created_group {
            format::create_private_dir(&group_dir)?;
        }
        if let Err(e) = format::write_atomic(&group_dir.join(name), &envelope, ENTRY_MODE) {
            if created_group {
                let _ = fs::remove_dir(&group_dir);
            }
            return Err(e);
        }

        debug!("added entry {location}");
        Ok(entry)
    }

    /// Decrypt and return an entry.
    ///
    /// Without a `group` the name must be unique across the store.
    pub fn get(&self, group: Option<&str>, name: &str) -> Result<Entry> {
        validate_lookup(group, name)?;

        let _lock = self.lock(LockMode::Shared)?;
        let tree = GroupTree::build(&self.root)?;
        let location = tree.resolve(name, group)?;

        let path = self.entry_path(&location);
        let envelope = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PassVaultError::NotFound(location.to_string()),
            _ => e.into(),
        })?;

        debug!("decrypting entry {location}");
        self.codec().decrypt(&location, &envelope)
    }

    /// Remove an entry, pruning its group directory if it becomes empty.
    pub fn del(&self, group: Option<&str>, name: &str) -> Result<EntryRef> {
        validate_lookup(group, name)?;

        let _lock = self.lock(LockMode::Exclusive)?;
        let tree = GroupTree::build(&self.root)?;
        let location = tree.resolve(name, group)?;

        fs::remove_file(self.entry_path(&location)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PassVaultError::NotFound(location.to_string()),
            _ => e.into(),
        })?;

        // Fails while other files remain, which is exactly when it should.
        if fs::remove_dir(self.root.join(&location.group)).is_ok() {
            debug!("pruned empty group '{}'", location.group);
        }

        debug!("deleted entry {location}");
        Ok(location)
    }

    /// List groups and entry names without decrypting anything.
    ///
    /// With `groups` only those groups are listed, and each of them must
    /// exist (`UnknownGroup` otherwise).
    pub fn list(&self, groups: Option<&BTreeSet<String>>) -> Result<Vec<GroupListing>> {
        let _lock = self.lock(LockMode::Shared)?;
        let tree = GroupTree::build(&self.root)?;
        tree.list_groups(groups, true)
    }

    /// Like [`Vault::list`], but requested groups that do not exist are
    /// skipped instead of failing the whole listing.
    pub fn list_lenient(&self, groups: Option<&BTreeSet<String>>) -> Result<Vec<GroupListing>> {
        let _lock = self.lock(LockMode::Shared)?;
        let tree = GroupTree::build(&self.root)?;
        tree.list_groups(groups, false)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The key identity recorded at `init`.
    pub fn key_id(&self) -> Result<String> {
        Ok(format::read_metadata(&self.root)?.key_id)
    }

    /// The full metadata record.
    pub fn metadata(&self) -> Result<StoreMetadata> {
        format::read_metadata(&self.root)
    }

    /// Returns the store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &VaultOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn codec(&self) -> EntryCodec<'_> {
        EntryCodec::new(self.capability.as_ref())
    }

    fn entry_path(&self, location: &EntryRef) -> PathBuf {
        self.root.join(&location.group).join(&location.name)
    }

    fn lock(&self, mode: LockMode) -> Result<StoreLock> {
        if !self.root.is_dir() {
            return Err(PassVaultError::StoreCorrupt(format!(
                "no store directory at {}",
                self.root.display()
            )));
        }
        StoreLock::acquire(&self.root, mode, self.options.lock_timeout)
    }
}

fn validate_lookup(group: Option<&str>, name: &str) -> Result<()> {
    if let Some(group) = group {
        validate_group_name(group)?;
    }
    validate_entry_name(name)
}

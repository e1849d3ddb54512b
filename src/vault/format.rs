//! On-disk layout of a store and the atomic write primitive.
//!
//! ```text
//! <root>/                      0700
//!   .passvault.json            StoreMetadata (JSON), 0400
//!   <group>/                   0700, one per non-empty group
//!     <entry>                  ciphertext produced by the key capability, 0600
//!     .<entry>.tmp             only while an `add` is in flight
//! ```
//!
//! Every file the store owns is written with [`write_atomic`]: the bytes
//! go to a temp file in the same directory, are flushed to disk, and the
//! temp file is renamed over the final name.  A reader therefore sees
//! either nothing or the complete file, never a truncated one.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{PassVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name of the metadata record inside the store root.
pub const METADATA_FILE: &str = ".passvault.json";

/// Current store layout version.
pub const FORMAT_VERSION: u32 = 1;

/// Permissions for directories owned by the store.
pub const DIR_MODE: u32 = 0o700;

/// Permissions for entry files.
pub const ENTRY_MODE: u32 = 0o600;

/// Permissions for the metadata record (immutable after `init`).
pub const METADATA_MODE: u32 = 0o400;

// ---------------------------------------------------------------------------
// StoreMetadata
// ---------------------------------------------------------------------------

/// The store's metadata record, written once by `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Layout version.
    pub format_version: u32,

    /// Identity every entry in this store is encrypted for.
    pub key_id: String,

    /// When the store was initialized.
    pub created_at: DateTime<Utc>,
}

impl StoreMetadata {
    pub fn new(key_id: &str) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            key_id: key_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Path of the metadata record for a store rooted at `root`.
pub fn metadata_path(root: &Path) -> PathBuf {
    root.join(METADATA_FILE)
}

/// Write the metadata record.  Fails if one already exists.
pub fn write_metadata(root: &Path, metadata: &StoreMetadata) -> Result<()> {
    let path = metadata_path(root);
    if path.exists() {
        return Err(PassVaultError::StoreExists(root.to_path_buf()));
    }

    let bytes = serde_json::to_vec_pretty(metadata)
        .map_err(|e| PassVaultError::Serialization(format!("store metadata: {e}")))?;
    write_atomic(&path, &bytes, METADATA_MODE)
}

/// Read and check the metadata record of the store at `root`.
///
/// Any problem here means `root` is not a usable store, so every
/// failure is reported as [`PassVaultError::StoreCorrupt`].
pub fn read_metadata(root: &Path) -> Result<StoreMetadata> {
    let path = metadata_path(root);
    if !path.is_file() {
        return Err(PassVaultError::StoreCorrupt(format!(
            "no store metadata found at {}",
            path.display()
        )));
    }

    let data = fs::read(&path)?;
    let metadata: StoreMetadata = serde_json::from_slice(&data).map_err(|e| {
        PassVaultError::StoreCorrupt(format!("unreadable metadata {}: {e}", path.display()))
    })?;

    if metadata.format_version == 0 || metadata.format_version > FORMAT_VERSION {
        return Err(PassVaultError::StoreCorrupt(format!(
            "unsupported store format version {}, expected {FORMAT_VERSION}",
            metadata.format_version
        )));
    }
    if metadata.key_id.trim().is_empty() {
        return Err(PassVaultError::StoreCorrupt(
            "store metadata has an empty key id".into(),
        ));
    }

    Ok(metadata)
}

// ---------------------------------------------------------------------------
// Atomic writes
// ---------------------------------------------------------------------------

/// Temp file used while writing `path`: `.<file name>.tmp` next to it.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

/// Write `data` to `path` **atomically** with the given Unix `mode`.
///
/// 1. Write to a temp file in the same directory.
/// 2. Flush it to disk.
/// 3. Rename it over the target path.
///
/// On failure the temp file is removed and `path` is untouched.
pub fn write_atomic(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let tmp_path = temp_path_for(path);

    let result = write_synced(&tmp_path, data, mode).and_then(|()| {
        fs::rename(&tmp_path, path)?;
        Ok(())
    });

    match result {
        Ok(()) => {
            sync_dir(path.parent().unwrap_or(Path::new(".")));
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

/// Create (or truncate) `path`, write `data`, and fsync it.
fn write_synced(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()?;

    // `mode` only applies to newly created files; a stale temp file
    // left behind by a crash keeps its old bits otherwise.
    set_mode(path, mode)?;
    Ok(())
}

/// Create a store-owned directory with restrictive permissions.
pub fn create_private_dir(path: &Path) -> Result<()> {
    fs::create_dir(path)?;
    set_mode(path, DIR_MODE)
}

fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

/// Best-effort fsync of a directory so a completed rename survives a crash.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
    #[cfg(not(unix))]
    let _ = dir;
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = zeroize::Zeroizing::new(BASE64.encode(data));
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = zeroize::Zeroizing::new(String::deserialize(deserializer)?);
    BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
}

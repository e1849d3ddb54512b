//! Vault module: grouped, encrypted entry storage on disk.
//!
//! - `names`: what a group or entry name may look like
//! - `entry`: decrypted entry values and their locations
//! - `codec`: canonical plaintext encoding and the encrypt/decrypt step
//! - `format`: on-disk layout, metadata record, atomic writes
//! - `tree`: group/entry index rebuilt from a directory scan
//! - `lock`: advisory lock over the store root
//! - `store`: the `Vault` handle tying it all together

pub mod codec;
pub mod entry;
pub mod format;
pub mod lock;
pub mod names;
pub mod store;
pub mod tree;

// Re-export the most commonly used items.
pub use codec::EntryCodec;
pub use entry::{Entry, EntryFields, EntryRef};
pub use format::StoreMetadata;
pub use lock::{LockMode, StoreLock};
pub use store::{SecretSource, Vault, VaultOptions, DEFAULT_GROUP};
pub use tree::{GroupListing, GroupTree};

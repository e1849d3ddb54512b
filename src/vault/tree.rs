//! In-memory index of a store's groups and entry names.
//!
//! A `GroupTree` is rebuilt from a directory listing at the start of
//! every vault operation and thrown away afterwards; it never reads or
//! decrypts entry payloads.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::warn;

use super::entry::EntryRef;
use super::format;
use super::names::is_reserved;
use crate::errors::{PassVaultError, Result};

/// One group and its entries, as returned by [`GroupTree::list_groups`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupListing {
    pub name: String,
    /// Entry names, sorted.
    pub entries: Vec<String>,
}

/// Mapping of group name to the sorted set of entry names it holds.
///
/// Only non-empty groups are present: a group exists exactly as long as
/// it contains an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTree {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl GroupTree {
    /// Scan the store at `root`.
    ///
    /// Each visible subdirectory is a group and each visible regular
    /// file inside it an entry.  Dot-files (the metadata record, temp
    /// files of an interrupted `add`) are never part of the tree.
    pub fn build(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(PassVaultError::StoreCorrupt(format!(
                "no store directory at {}",
                root.display()
            )));
        }
        if !format::metadata_path(root).is_file() {
            return Err(PassVaultError::StoreCorrupt(format!(
                "{} is not an initialized store (missing {})",
                root.display(),
                format::METADATA_FILE
            )));
        }

        let mut groups = BTreeMap::new();
        for dir_entry in fs::read_dir(root)? {
            let dir_entry = dir_entry?;
            let Some(group) = visible_name(&dir_entry) else {
                continue;
            };
            if !dir_entry.file_type()?.is_dir() {
                warn!("ignoring stray file '{group}' in store root");
                continue;
            }

            let entries = scan_group(&dir_entry.path(), &group)?;
            if !entries.is_empty() {
                groups.insert(group, entries);
            }
        }

        Ok(Self { groups })
    }

    /// Build a tree from `(group, name)` pairs.
    pub fn from_entries<G, N, I>(pairs: I) -> Self
    where
        G: Into<String>,
        N: Into<String>,
        I: IntoIterator<Item = (G, N)>,
    {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (group, name) in pairs {
            groups.entry(group.into()).or_default().insert(name.into());
        }
        Self { groups }
    }

    /// List groups and their entries, both sorted lexicographically.
    ///
    /// With no filter (or an empty one) every group is returned.  With a
    /// filter only the named groups are returned; a named group that
    /// does not exist is an error when `strict`, and silently skipped
    /// otherwise.
    pub fn list_groups(
        &self,
        filter: Option<&BTreeSet<String>>,
        strict: bool,
    ) -> Result<Vec<GroupListing>> {
        let filter = filter.filter(|f| !f.is_empty());

        if let (Some(wanted), true) = (filter, strict) {
            if let Some(missing) = wanted.iter().find(|g| !self.groups.contains_key(*g)) {
                return Err(PassVaultError::UnknownGroup(missing.clone()));
            }
        }

        Ok(self
            .groups
            .iter()
            .filter(|(name, _)| filter.map_or(true, |wanted| wanted.contains(*name)))
            .map(|(name, entries)| GroupListing {
                name: name.clone(),
                entries: entries.iter().cloned().collect(),
            })
            .collect())
    }

    /// Find the entry called `name`.
    ///
    /// With an explicit `group` only that group is searched.  Without
    /// one, every group is searched and the name must be unique across
    /// the store.
    pub fn resolve(&self, name: &str, group: Option<&str>) -> Result<EntryRef> {
        if let Some(group) = group {
            return if self.exists(group, name) {
                Ok(EntryRef::new(group, name))
            } else {
                Err(PassVaultError::NotFound(format!("{group}/{name}")))
            };
        }

        let matches: Vec<&String> = self
            .groups
            .iter()
            .filter(|(_, entries)| entries.contains(name))
            .map(|(group, _)| group)
            .collect();

        match matches.as_slice() {
            [] => Err(PassVaultError::NotFound(name.to_string())),
            [only] => Ok(EntryRef::new(only.as_str(), name)),
            _ => Err(PassVaultError::AmbiguousEntry {
                name: name.to_string(),
                groups: matches.iter().map(|g| (*g).clone()).collect(),
            }),
        }
    }

    /// Whether `group` holds an entry called `name`.
    pub fn exists(&self, group: &str, name: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|entries| entries.contains(name))
    }

    /// Fail with `DuplicateEntry` if `group/name` is already taken.
    pub fn assert_absent(&self, group: &str, name: &str) -> Result<()> {
        if self.exists(group, name) {
            return Err(PassVaultError::DuplicateEntry {
                group: group.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn entry_count(&self) -> usize {
        self.groups.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Entry names inside one group directory.
fn scan_group(dir: &Path, group: &str) -> Result<BTreeSet<String>> {
    let mut entries = BTreeSet::new();
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let Some(name) = visible_name(&dir_entry) else {
            continue;
        };
        if dir_entry.file_type()?.is_file() {
            entries.insert(name);
        } else {
            warn!("ignoring non-file '{name}' in group '{group}'");
        }
    }
    Ok(entries)
}

/// The UTF-8 name of a directory entry, unless it is store-internal.
fn visible_name(dir_entry: &fs::DirEntry) -> Option<String> {
    match dir_entry.file_name().into_string() {
        Ok(name) if is_reserved(&name) => None,
        Ok(name) => Some(name),
        Err(raw) => {
            warn!("ignoring non UTF-8 name {raw:?} in store");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(listing: &[GroupListing]) -> Vec<(&str, Vec<&str>)> {
        listing
            .iter()
            .map(|g| (g.name.as_str(), g.entries.iter().map(String::as_str).collect()))
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn store_with(pairs: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(format::metadata_path(dir.path()), b"{}").unwrap();
        for (group, name) in pairs {
            let group_dir = dir.path().join(group);
            fs::create_dir_all(&group_dir).unwrap();
            fs::write(group_dir.join(name), b"ciphertext").unwrap();
        }
        dir
    }

    #[test]
    fn build_requires_metadata_marker() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GroupTree::build(dir.path()),
            Err(PassVaultError::StoreCorrupt(_))
        ));
    }

    #[test]
    fn build_requires_existing_root() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GroupTree::build(&dir.path().join("missing")),
            Err(PassVaultError::StoreCorrupt(_))
        ));
    }

    #[test]
    fn build_scans_groups_and_entries() {
        let dir = store_with(&[("b", "y"), ("a", "y"), ("b", "x"), ("a", "x")]);
        let tree = GroupTree::build(dir.path()).unwrap();
        assert_eq!(tree.group_count(), 2);
        assert_eq!(tree.entry_count(), 4);
        assert_eq!(
            names(&tree.list_groups(None, true).unwrap()),
            vec![("a", vec!["x", "y"]), ("b", vec!["x", "y"])]
        );
    }

    #[test]
    fn build_skips_hidden_files_and_empty_groups() {
        let dir = store_with(&[("work", "vpn")]);
        fs::write(dir.path().join("work").join(".mail.tmp"), b"partial").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::create_dir(dir.path().join("only-temp")).unwrap();
        fs::write(dir.path().join("only-temp").join(".x.tmp"), b"partial").unwrap();
        fs::write(dir.path().join("stray"), b"?").unwrap();

        let tree = GroupTree::build(dir.path()).unwrap();
        assert_eq!(
            names(&tree.list_groups(None, true).unwrap()),
            vec![("work", vec!["vpn"])]
        );
    }

    #[test]
    fn filter_restricts_listing() {
        let tree = GroupTree::from_entries([
            ("default", "a"),
            ("work", "vpn"),
            ("work", "mail"),
            ("social", "forum"),
        ]);
        let listing = tree.list_groups(Some(&set(&["work"])), true).unwrap();
        assert_eq!(names(&listing), vec![("work", vec!["mail", "vpn"])]);
    }

    #[test]
    fn strict_filter_rejects_unknown_group() {
        let tree = GroupTree::from_entries([("default", "a")]);
        let err = tree
            .list_groups(Some(&set(&["default", "work"])), true)
            .unwrap_err();
        assert!(matches!(err, PassVaultError::UnknownGroup(g) if g == "work"));
    }

    #[test]
    fn lenient_filter_skips_unknown_group() {
        let tree = GroupTree::from_entries([("default", "a"), ("work", "b")]);
        let listing = tree
            .list_groups(Some(&set(&["work", "NoSuchGroup"])), false)
            .unwrap();
        assert_eq!(names(&listing), vec![("work", vec!["b"])]);
    }

    #[test]
    fn empty_filter_lists_everything() {
        let tree = GroupTree::from_entries([("b", "1"), ("a", "2")]);
        let listing = tree.list_groups(Some(&BTreeSet::new()), true).unwrap();
        assert_eq!(names(&listing), vec![("a", vec!["2"]), ("b", vec!["1"])]);
    }

    #[test]
    fn resolve_in_explicit_group() {
        let tree = GroupTree::from_entries([("work", "vpn"), ("home", "vpn")]);
        assert_eq!(
            tree.resolve("vpn", Some("work")).unwrap(),
            EntryRef::new("work", "vpn")
        );
        assert!(matches!(
            tree.resolve("vpn", Some("social")),
            Err(PassVaultError::NotFound(_))
        ));
    }

    #[test]
    fn resolve_without_group_searches_everywhere() {
        let tree = GroupTree::from_entries([("work", "vpn"), ("home", "router")]);
        assert_eq!(
            tree.resolve("router", None).unwrap(),
            EntryRef::new("home", "router")
        );
        assert!(matches!(
            tree.resolve("nothing", None),
            Err(PassVaultError::NotFound(_))
        ));
    }

    #[test]
    fn resolve_reports_ambiguity() {
        let tree = GroupTree::from_entries([("work", "vpn"), ("home", "vpn")]);
        match tree.resolve("vpn", None) {
            Err(PassVaultError::AmbiguousEntry { name, groups }) => {
                assert_eq!(name, "vpn");
                assert_eq!(groups, vec!["home".to_string(), "work".to_string()]);
            }
            other => panic!("expected AmbiguousEntry, got {other:?}"),
        }
    }

    #[test]
    fn assert_absent_detects_duplicates() {
        let tree = GroupTree::from_entries([("default", "github")]);
        assert!(tree.assert_absent("default", "gitlab").is_ok());
        assert!(tree.assert_absent("work", "github").is_ok());
        assert!(matches!(
            tree.assert_absent("default", "github"),
            Err(PassVaultError::DuplicateEntry { .. })
        ));
    }
}

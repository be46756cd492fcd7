use std::collections::BTreeMap;

use super::args::CommandArgumentSet;
use super::paths::normalize_key;

/// Map from source file path to its command arguments.
///
/// Every operation normalizes the path through [`normalize_key`], so lookups
/// are case-insensitive and separator-agnostic. The first registration of a
/// path wins.
#[derive(Debug, Default)]
pub struct FileRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Path as it was first registered.
    pub path: String,
    pub args: CommandArgumentSet,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_key(path))
    }

    /// Inserts `args` for `path`. Returns false when the path was already known.
    pub fn add(&mut self, path: &str, args: CommandArgumentSet) -> bool {
        let key = normalize_key(path);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            RegistryEntry {
                path: path.to_string(),
                args,
            },
        );
        true
    }

    pub fn try_get(&self, path: &str) -> Option<&CommandArgumentSet> {
        self.entries.get(&normalize_key(path)).map(|e| &e.args)
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, &CommandArgumentSet)> {
        self.entries.values().map(|e| (e.path.as_str(), &e.args))
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut RegistryEntry> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

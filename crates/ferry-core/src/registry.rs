//! Logical repository names and where they live for a run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Logical name to local path, fixed for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryRegistry {
    entries: BTreeMap<String, PathBuf>,
}

impl RepositoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` at `path`.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(name.into(), path.into());
    }

    /// Path registered for `name`.
    ///
    /// # Errors
    /// Returns `UnknownRepository` if `name` is not registered.
    pub fn path(&self, name: &str) -> Result<&Path> {
        self.entries
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::UnknownRepository(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discover components as the directories directly below `root/staging_dir`.
    ///
    /// Each component maps to its subtree path relative to `root`.
    ///
    /// # Errors
    /// Returns error if the staging directory can't be read.
    pub fn discover_staging(root: &Path, staging_dir: &str) -> Result<Self> {
        let staging = staging_dir.trim_end_matches('/');
        let mut registry = Self::new();
        for entry in fs::read_dir(root.join(staging))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            registry.insert(name.clone(), Path::new(staging).join(&name));
        }
        Ok(registry)
    }
}

/// Opened repositories by logical name.
#[derive(Debug)]
pub struct RepositorySet<G> {
    repos: BTreeMap<String, G>,
}

impl<G> Default for RepositorySet<G> {
    fn default() -> Self {
        Self {
            repos: BTreeMap::new(),
        }
    }
}

impl<G> RepositorySet<G> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, repo: G) {
        self.repos.insert(name.into(), repo);
    }

    /// Repository registered as `name`.
    ///
    /// # Errors
    /// Returns `UnknownRepository` if `name` is not registered.
    pub fn get(&self, name: &str) -> Result<&G> {
        self.repos
            .get(name)
            .ok_or_else(|| Error::UnknownRepository(name.to_string()))
    }

    /// Open every entry of `registry` with `open`.
    ///
    /// # Errors
    /// Returns the first error from `open`.
    pub fn open_all<F>(registry: &RepositoryRegistry, mut open: F) -> Result<Self>
    where
        F: FnMut(&Path) -> Result<G>,
    {
        let mut set = Self::new();
        for (name, path) in registry.iter() {
            set.insert(name, open(path)?);
        }
        Ok(set)
    }
}

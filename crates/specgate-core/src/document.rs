//! Ordered sets of OpenAPI documents.

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Logical document names mapped to specification files.
///
/// Names are unique and iteration follows insertion order, which is the
/// order the configuration lists them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSet {
    entries: IndexMap<String, PathBuf>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from pairs, rejecting duplicate names.
    pub fn from_pairs<I, N, P>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<PathBuf>,
    {
        let mut set = Self::new();
        for (name, path) in pairs {
            set.insert(name, path)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::Config(format!("duplicate document name '{}'", name)));
        }
        self.entries.insert(name, path.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.values().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the document whose file has the given file name, regardless of
    /// the directory it lives in.
    pub fn find_by_file_name(&self, file_name: &OsStr) -> Option<(&str, &Path)> {
        self.iter()
            .find(|(_, path)| path.file_name() == Some(file_name))
    }
}

//! A single package source within a [`crate::RepoPool`].

use std::path::Path;

use xbps_pkgdb::{PackageRecord, PkgDB};
use xbps_types::{DependencyPattern, Name};

use crate::Error;

/// One repository: a named, priority-ordered source of [`PackageRecord`]s.
///
/// Repositories use the same on-disk encoding as the installed-package database (§3a/§9b), loaded
/// read-only — a repository is never mutated by the resolver or the driver.
#[derive(Debug)]
pub struct Repository {
    name: String,
    index: PkgDB,
}

impl Repository {
    /// Loads a repository named `name` from the index directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or an entry fails to parse.
    pub fn load(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, Error> {
        let index = PkgDB::open_readonly(path)?;
        Ok(Self {
            name: name.into(),
            index,
        })
    }

    /// This repository's configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the record matching `pattern` by real package name, if any.
    pub fn find_pkg(&self, pattern: &DependencyPattern) -> Option<&PackageRecord> {
        let record = self.index.find_installed(pattern.name())?;
        pattern.matches(&record.version).then_some(record)
    }

    /// Returns a record providing `pattern` as a virtual package, if any.
    pub fn find_virtualpkg(&self, pattern: &DependencyPattern) -> Option<&PackageRecord> {
        let record = self.index.find_virtualpkg_installed(pattern.name())?;
        record
            .provides
            .iter()
            .find(|p| p.name() == pattern.name())
            .is_some_and(|provided_pattern| {
                provided_pattern
                    .constraint()
                    .map(|(_, v)| pattern.matches(v))
                    .unwrap_or(true)
            })
            .then_some(record)
    }

    /// Every record held by this repository.
    pub fn entries(&self) -> Vec<&PackageRecord> {
        self.index.entries()
    }

    /// Returns a record by exact name, ignoring version constraints.
    pub fn find_by_name(&self, name: &Name) -> Option<&PackageRecord> {
        self.index.find_installed(name)
    }
}

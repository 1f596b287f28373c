//! The installed-package database: a directory tree of `pkg.meta` entries plus in-memory indexes.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, create_dir_all, read_dir, read_to_string},
    path::{Path, PathBuf},
    sync::Arc,
};

use xbps_types::{DependencyPattern, Name};

use crate::{Error, LockGuard, PackageRecord, PackageState};

/// The installed-package database.
///
/// Keyed primarily by package name, with two secondary indexes kept in sync on every mutation:
/// `by_virtual`, mapping a virtual-package name to its providers, and `revdeps`, mapping a name to
/// the set of installed packages that depend on it.
#[derive(Debug)]
pub struct PkgDB {
    base_path: PathBuf,
    records: BTreeMap<Name, PackageRecord>,
    by_virtual: BTreeMap<Name, Vec<(Name, DependencyPattern)>>,
    revdeps: BTreeMap<Name, BTreeSet<Name>>,
    lock: Option<Arc<LockGuard>>,
}

impl PkgDB {
    /// Creates a new, empty database at `base_path`, acquiring the database lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock cannot be acquired.
    pub fn create(base_path: impl AsRef<Path>) -> Result<Self, Error> {
        let base_path = base_path.as_ref();
        create_dir_all(base_path).map_err(|source| Error::IoPath {
            path: base_path.to_path_buf(),
            source,
        })?;
        let lock = Arc::new(LockGuard::acquire(base_path)?);
        Ok(Self {
            base_path: base_path.to_path_buf(),
            records: BTreeMap::new(),
            by_virtual: BTreeMap::new(),
            revdeps: BTreeMap::new(),
            lock: Some(lock),
        })
    }

    /// Opens an existing database at `base_path`, loading every `pkg.meta` entry and acquiring the
    /// lock.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_path` does not exist, is not a directory, an entry fails to
    /// parse, or two entries claim the same package name.
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, Error> {
        let base_path = base_path.as_ref();
        let metadata = fs::metadata(base_path).map_err(|source| Error::IoPath {
            path: base_path.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(Error::NotADirectory {
                path: base_path.to_path_buf(),
            });
        }
        let lock = Arc::new(LockGuard::acquire(base_path)?);

        let mut db = Self {
            base_path: base_path.to_path_buf(),
            records: BTreeMap::new(),
            by_virtual: BTreeMap::new(),
            revdeps: BTreeMap::new(),
            lock: Some(lock),
        };
        db.load()?;
        Ok(db)
    }

    /// Opens an existing database read-only, without acquiring the lock.
    ///
    /// Used by dry-run plans and by readers that must tolerate a concurrent mutator, per the
    /// concurrency model: readers proceed without the lock but see only committed state.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`PkgDB::open`], except lock acquisition is never attempted.
    pub fn open_readonly(base_path: impl AsRef<Path>) -> Result<Self, Error> {
        let base_path = base_path.as_ref();
        let metadata = fs::metadata(base_path).map_err(|source| Error::IoPath {
            path: base_path.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(Error::NotADirectory {
                path: base_path.to_path_buf(),
            });
        }
        let mut db = Self {
            base_path: base_path.to_path_buf(),
            records: BTreeMap::new(),
            by_virtual: BTreeMap::new(),
            revdeps: BTreeMap::new(),
            lock: None,
        };
        db.load()?;
        Ok(db)
    }

    fn load(&mut self) -> Result<(), Error> {
        let mut seen_dirs: BTreeMap<Name, Vec<String>> = BTreeMap::new();
        for dir_entry in read_dir(&self.base_path).map_err(|source| Error::IoPath {
            path: self.base_path.clone(),
            source,
        })? {
            let dir_entry = dir_entry.map_err(|source| Error::IoPath {
                path: self.base_path.clone(),
                source,
            })?;
            let file_type = dir_entry.file_type().map_err(|source| Error::IoPath {
                path: self.base_path.clone(),
                source,
            })?;
            if !file_type.is_dir() || file_type.is_symlink() {
                continue;
            }
            let path = dir_entry.path();
            let meta_path = path.join("pkg.meta");
            if !meta_path.exists() {
                continue;
            }
            let contents = read_to_string(&meta_path).map_err(|source| Error::IoPath {
                path: meta_path.clone(),
                source,
            })?;
            let record = PackageRecord::from_meta(&contents, &path)?;
            let dir_name = dir_entry.file_name().to_string_lossy().into_owned();
            seen_dirs
                .entry(record.name.clone())
                .or_default()
                .push(dir_name);
            self.insert_indexed(record);
        }
        if let Some((name, dirs)) = seen_dirs.into_iter().find(|(_, dirs)| dirs.len() > 1) {
            return Err(Error::DuplicateEntry {
                name: name.to_string(),
                entries: dirs,
            });
        }
        Ok(())
    }

    /// Returns all records, sorted by name.
    pub fn entries(&self) -> Vec<&PackageRecord> {
        self.records.values().collect()
    }

    /// Looks up an installed record by exact name.
    pub fn find_installed(&self, name: &Name) -> Option<&PackageRecord> {
        self.records.get(name)
    }

    /// Looks up an installed record that provides `name` as a virtual package.
    pub fn find_virtualpkg_installed(&self, name: &Name) -> Option<&PackageRecord> {
        self.by_virtual
            .get(name)?
            .iter()
            .find_map(|(provider, _)| self.records.get(provider))
    }

    /// Returns the names of installed packages that depend on `name`.
    pub fn revdeps_of(&self, name: &Name) -> BTreeSet<Name> {
        self.revdeps.get(name).cloned().unwrap_or_default()
    }

    /// Returns the lifecycle state of `name`, or [`PackageState::NotInstalled`] if absent.
    pub fn state_of(&self, name: &Name) -> PackageState {
        self.records
            .get(name)
            .map(|r| r.state)
            .unwrap_or(PackageState::NotInstalled)
    }

    /// Updates the state of an existing record in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEntry`]-free success, or an I/O error writing the updated entry;
    /// the call is a no-op if `name` has no record.
    pub fn set_state(&mut self, name: &Name, state: PackageState) -> Result<(), Error> {
        let Some(record) = self.records.get_mut(name) else {
            return Ok(());
        };
        record.state = state;
        let record = record.clone();
        self.persist(&record)
    }

    /// Inserts or replaces a record, updating indexes and writing it to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn insert(&mut self, record: PackageRecord) -> Result<(), Error> {
        if let Some(existing) = self.records.get(&record.name) {
            let old_dir = self.entry_dir(existing);
            if old_dir != self.entry_dir(&record) && old_dir.exists() {
                fs::remove_dir_all(&old_dir).map_err(|source| Error::IoPath {
                    path: old_dir,
                    source,
                })?;
            }
            self.remove_indexes(&record.name.clone());
        }
        self.persist(&record)?;
        self.insert_indexed(record);
        Ok(())
    }

    /// Removes a record by name, updating indexes and deleting its on-disk directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the on-disk directory exists but cannot be removed.
    pub fn remove(&mut self, name: &Name) -> Result<(), Error> {
        if let Some(record) = self.records.get(name) {
            let dir = self.entry_dir(record);
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|source| Error::IoPath {
                    path: dir,
                    source,
                })?;
            }
        }
        self.remove_indexes(name);
        Ok(())
    }

    fn entry_dir(&self, record: &PackageRecord) -> PathBuf {
        self.base_path.join(format!("{}-{}", record.name, record.version))
    }

    fn persist(&self, record: &PackageRecord) -> Result<(), Error> {
        let dir = self.entry_dir(record);
        create_dir_all(&dir).map_err(|source| Error::IoPath {
            path: dir.clone(),
            source,
        })?;
        let meta_path = dir.join("pkg.meta");
        fs::write(&meta_path, record.to_meta()).map_err(|source| Error::IoPath {
            path: meta_path,
            source,
        })
    }

    fn insert_indexed(&mut self, record: PackageRecord) {
        let name = record.name.clone();
        for pattern in &record.provides {
            self.by_virtual
                .entry(pattern.name().clone())
                .or_default()
                .push((name.clone(), pattern.clone()));
        }
        for pattern in &record.run_depends {
            self.revdeps
                .entry(pattern.name().clone())
                .or_default()
                .insert(name.clone());
        }
        self.records.insert(name, record);
    }

    fn remove_indexes(&mut self, name: &Name) {
        let Some(record) = self.records.remove(name) else {
            return;
        };
        for pattern in &record.provides {
            if let Some(providers) = self.by_virtual.get_mut(pattern.name()) {
                providers.retain(|(provider, _)| provider != name);
            }
        }
        for pattern in &record.run_depends {
            if let Some(dependents) = self.revdeps.get_mut(pattern.name()) {
                dependents.remove(name);
            }
        }
        self.revdeps.remove(name);
    }
}

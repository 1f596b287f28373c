//! File-based advisory locking of the package database directory.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::Error;

/// The name of the lock file used to prevent concurrent mutation of a package database.
const PKGDB_LOCK_FILE_NAME: &str = "pkgdb.lck";

/// An exclusive, file-based lock on a package database directory.
///
/// Acquired with `create_new` so two holders can never both succeed; released on [`Drop`] so every
/// exit path, including a panic unwind, releases it.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    _file: fs::File,
}

impl LockGuard {
    /// Acquires the lock on the database rooted at `base_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatabaseLocked`] if the lock file already exists (another holder is
    /// active) or cannot otherwise be created.
    pub fn acquire(base_path: &Path) -> Result<Self, Error> {
        let path = base_path.join(PKGDB_LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| Error::DatabaseLocked {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, _file: file })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

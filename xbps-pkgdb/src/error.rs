//! Error types for the package database.

use std::path::PathBuf;

/// Errors produced while reading, writing, or locking the package database.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O operation on a path within the database failed.
    #[error("I/O error at {path}: {source}")]
    IoPath {
        /// The path the operation was performed on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `base_path` exists but is not a directory.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// Two on-disk entries claim the same package name.
    #[error("duplicate package database entry for {name}: {entries:?}")]
    DuplicateEntry {
        /// The package name that is duplicated.
        name: String,
        /// The directory names found for that package.
        entries: Vec<String>,
    },

    /// An entry's `pkg.meta` file is missing a required key or has an unparseable value.
    #[error("malformed pkg.meta entry at {path}: {reason}")]
    MalformedEntry {
        /// The path of the offending entry.
        path: PathBuf,
        /// A human-readable description of the problem.
        reason: String,
    },

    /// A record with this name already exists and `create_entry` does not overwrite.
    #[error("package database entry already exists: {name}")]
    AlreadyExists {
        /// The conflicting package name.
        name: String,
    },

    /// The database lock file could not be acquired because another process holds it.
    #[error("package database is locked: {path}")]
    DatabaseLocked {
        /// The lock file's path.
        path: PathBuf,
        /// The underlying I/O error returned by the OS.
        #[source]
        source: std::io::Error,
    },

    /// A version, name, or dependency pattern in an entry failed to parse.
    #[error(transparent)]
    Types(#[from] xbps_types::Error),
}

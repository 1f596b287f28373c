//! The `xbps-cli` binary's top-level error type, wrapping every lower crate's own (§7a).

use std::path::PathBuf;

/// Errors surfaced by the embedder API and the `xbps-remove` front-end.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A package database operation failed.
    #[error(transparent)]
    PkgDB(#[from] xbps_pkgdb::Error),

    /// A repository pool operation failed.
    #[error(transparent)]
    Repo(#[from] xbps_repo::Error),

    /// Building or sorting a transaction plan failed.
    #[error(transparent)]
    Resolver(#[from] xbps_resolver::Error),

    /// Executing a transaction plan failed.
    #[error(transparent)]
    Transaction(#[from] xbps_transaction::Error),

    /// A name, version, or dependency pattern failed to parse.
    #[error(transparent)]
    Types(#[from] xbps_types::Error),

    /// Reading or parsing a configuration file failed.
    #[error("failed to read configuration file {path}: {source}")]
    ConfigIo {
        /// The configuration file's path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file line could not be parsed as `KEY=value`.
    #[error("malformed configuration line in {path}: {line:?}")]
    ConfigMalformed {
        /// The configuration file's path.
        path: PathBuf,
        /// The offending line.
        line: String,
    },

    /// The requested package has no installed record.
    #[error("package {0} is not installed")]
    PkgNotInstalled(xbps_types::Name),
}

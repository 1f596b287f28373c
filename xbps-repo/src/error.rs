//! Error types for the repository pool.

/// Errors produced while loading or querying a repository pool.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Loading a repository's on-disk index failed.
    #[error(transparent)]
    PkgDB(#[from] xbps_pkgdb::Error),

    /// A dependency pattern failed to parse.
    #[error(transparent)]
    Types(#[from] xbps_types::Error),
}

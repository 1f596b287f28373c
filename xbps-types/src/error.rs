//! Error types for version and dependency-pattern parsing.

/// Errors produced while parsing or comparing versions and dependency patterns.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A dependency pattern could not be split into a name and an optional comparator/version.
    #[error("malformed dependency pattern: {0:?}")]
    MalformedPattern(String),

    /// An epoch component was present but was not a non-negative integer.
    #[error("invalid epoch {0:?}: must be a non-negative integer")]
    InvalidEpoch(String),

    /// A pkgver component was empty or contained a character outside `[A-Za-z0-9_.+]`.
    #[error("invalid pkgver {0:?}")]
    InvalidPkgver(String),

    /// A pkgrel component was empty or contained a character outside `[A-Za-z0-9_.]`.
    #[error("invalid pkgrel {0:?}")]
    InvalidPkgrel(String),

    /// A package or pattern name was empty or contained a disallowed character.
    #[error("invalid package name {0:?}")]
    InvalidName(String),
}

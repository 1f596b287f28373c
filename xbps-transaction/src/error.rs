//! Error types for the transaction driver.

use xbps_types::Name;

/// Errors produced while executing a transaction plan.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The named package has no installed record.
    #[error("package {0} is not installed")]
    PkgNotInstalled(Name),

    /// Removal was requested but other installed packages still depend on it.
    #[error("{name} is required by {} package(s)", revdeps.len())]
    HasRevdeps {
        /// The package that was asked to be removed.
        name: Name,
        /// The installed packages that still depend on it.
        revdeps: Vec<Name>,
    },

    /// The cooperative cancellation flag was set between plan steps.
    #[error("transaction execution was cancelled")]
    Cancelled,

    /// A collaborator callback reported a failure that is not safely ignorable.
    #[error("collaborator step failed for {name}: {reason}")]
    CollaboratorFailed {
        /// The package the failing step targeted.
        name: Name,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// A package-database operation failed (including lock acquisition).
    #[error(transparent)]
    PkgDB(#[from] xbps_pkgdb::Error),
}

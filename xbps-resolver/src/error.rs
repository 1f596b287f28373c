//! Error types for the resolver.

use xbps_types::{DependencyPattern, Name, Version};

/// Errors produced while building or sorting a transaction plan.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Recursion while resolving run-dependencies exceeded the depth cap (512).
    #[error("dependency resolution exceeded the maximum recursion depth (512)")]
    ResolverDepthExceeded,

    /// A pattern names a dependency that no repository in the pool can satisfy, and the name is
    /// not a user-requested root (roots instead fail with [`Error::RepositoryMiss`]).
    #[error("no repository provides a package matching {pattern}")]
    RepositoryMiss {
        /// The unsatisfiable pattern.
        pattern: DependencyPattern,
    },

    /// A newly encountered pattern requires a version strictly greater than what the entry
    /// already queued for that name satisfies.
    #[error(
        "conflicting version requirements for {name}: {queued_version} is already queued, but {required} requires a strictly greater version"
    )]
    ConstraintConflict {
        /// The package name in conflict.
        name: Name,
        /// The version already queued for `name`.
        queued_version: Version,
        /// The pattern that the queued version cannot satisfy.
        required: DependencyPattern,
    },

    /// The sorter found a cycle in the depends-on relation restricted to the plan.
    #[error("dependency cycle detected: {}", cycle.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(" -> "))]
    DependencyCycle {
        /// The package names forming the cycle, in traversal order.
        cycle: Vec<xbps_types::Name>,
    },

    /// A PkgDB operation failed.
    #[error(transparent)]
    PkgDB(#[from] xbps_pkgdb::Error),

    /// A repository pool operation failed.
    #[error(transparent)]
    Repo(#[from] xbps_repo::Error),

    /// A version, name, or dependency pattern failed to parse.
    #[error(transparent)]
    Types(#[from] xbps_types::Error),
}

//! The transaction plan's row and collection types.

use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

use xbps_pkgdb::PackageRecord;
use xbps_types::{DependencyPattern, Name};

/// What a [`TransactionEntry`] does to the package database.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// The package has no existing record and will be installed fresh.
    Install,
    /// The package is installed and will be replaced with a different candidate.
    Update,
    /// The package is `Unpacked` and only needs its post-install step run.
    Configure,
    /// The package will be removed.
    Remove,
    /// The package is held back from an otherwise-implied removal.
    HoldRemove,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Install => "install",
            Action::Update => "update",
            Action::Configure => "configure",
            Action::Remove => "remove",
            Action::HoldRemove => "hold-remove",
        };
        write!(f, "{s}")
    }
}

/// One row of a transaction plan: a target record, the action to apply to it, and flags.
#[derive(Clone, Debug)]
pub struct TransactionEntry {
    /// The package this entry acts on.
    pub record: PackageRecord,
    /// What to do with it.
    pub action: Action,
    /// Whether this entry was pulled in only to satisfy another entry's dependency.
    pub automatic: bool,
    /// Whether this entry overrides a normally-blocking check (e.g. `force_revdeps`).
    pub forced: bool,
}

impl TransactionEntry {
    /// The name of the package this entry targets.
    pub fn name(&self) -> &Name {
        &self.record.name
    }
}

/// The builder's working state: queued entries, unsatisfiable requirements, and diagnostics.
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    /// Queued entries, at most one per package name.
    pub unsorted_deps: BTreeMap<Name, TransactionEntry>,
    /// Dependency patterns no repository could satisfy, at most one per name (the most demanding
    /// version requirement seen for that name wins).
    pub missing_deps: Vec<DependencyPattern>,
    /// Diagnostic strings describing conflicts encountered while building the plan.
    pub conflicts: Vec<String>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }
}

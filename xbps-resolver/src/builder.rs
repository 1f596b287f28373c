//! Builds a [`Transaction`] from a set of user-requested root packages.
//!
//! Reproduces `find_repo_deps`/`store_dependency`/`add_missing_reqdep` from the distribution's
//! resolver (`repository_finddeps.c`): a four-pass per-dependency procedure applied depth-first
//! over each root's run-dependency graph, with a hard recursion cap.

use std::cmp::Ordering;

use log::{debug, trace};
use xbps_pkgdb::{PackageRecord, PackageState, PkgDB};
use xbps_repo::RepoPool;
use xbps_types::DependencyPattern;

use crate::{
    Error,
    types::{Action, Transaction, TransactionEntry},
};

/// The recursion depth at which resolution aborts with [`Error::ResolverDepthExceeded`].
pub const MAX_DEPTH: usize = 512;

/// Resolves run-dependencies for a set of root packages into a [`Transaction`].
///
/// Holds read-only references to the installed-package database and the repository pool for the
/// lifetime of one resolution pass; per §5, the builder must observe a single coherent snapshot.
#[derive(Debug)]
pub struct TransactionBuilder<'a> {
    pkgdb: &'a PkgDB,
    repos: &'a RepoPool,
}

impl<'a> TransactionBuilder<'a> {
    /// Creates a builder over the given database and repository pool.
    pub fn new(pkgdb: &'a PkgDB, repos: &'a RepoPool) -> Self {
        Self { pkgdb, repos }
    }

    /// Resolves a user-requested root package, inserting it as a non-automatic entry and
    /// recursing into its run-dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepositoryMiss`] if no repository provides `pattern`, or any error from
    /// [`TransactionBuilder::resolve_rundeps`].
    pub fn add_root(&self, txn: &mut Transaction, pattern: &DependencyPattern) -> Result<(), Error> {
        let candidate = self
            .repos
            .find_virtualpkg(pattern)
            .or_else(|| self.repos.find_pkg(pattern))
            .ok_or_else(|| Error::RepositoryMiss {
                pattern: pattern.clone(),
            })?
            .clone();

        let action = self.classify_action(&candidate);
        debug!("{}: root requested, action={action}", candidate.pkgver);
        self.enqueue(txn, candidate.clone(), action, false, false);
        self.resolve_rundeps(txn, &candidate, 0)
    }

    /// Resolves every pattern in `record.run_depends`, recursing into each newly queued
    /// candidate's own run-dependencies at `depth + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolverDepthExceeded`] if `depth` has reached [`MAX_DEPTH`], or any error
    /// raised while resolving an individual pattern.
    pub fn resolve_rundeps(
        &self,
        txn: &mut Transaction,
        record: &PackageRecord,
        depth: usize,
    ) -> Result<(), Error> {
        if depth >= MAX_DEPTH {
            return Err(Error::ResolverDepthExceeded);
        }
        for pattern in &record.run_depends {
            trace!("{}{} requires {pattern}", " ".repeat(depth), record.pkgver);
            self.resolve_one(txn, pattern, depth)?;
        }
        Ok(())
    }

    fn resolve_one(
        &self,
        txn: &mut Transaction,
        pattern: &DependencyPattern,
        depth: usize,
    ) -> Result<(), Error> {
        // Pass 1: already installed, as a real package or a virtual provider?
        let installed = self
            .pkgdb
            .find_installed(pattern.name())
            .or_else(|| self.pkgdb.find_virtualpkg_installed(pattern.name()));
        if let Some(installed) = installed {
            if installed.provides_pattern(pattern) {
                trace!("{pattern}: satisfied by virtual provider {}", installed.pkgver);
                return Ok(());
            }
            if pattern.matches(&installed.version) {
                return match installed.state {
                    PackageState::Installed => {
                        trace!("{pattern}: satisfied by installed {}", installed.pkgver);
                        Ok(())
                    }
                    PackageState::Unpacked => {
                        trace!("{pattern}: {} unpacked, needs configure", installed.pkgver);
                        self.enqueue(txn, installed.clone(), Action::Configure, true, false);
                        Ok(())
                    }
                    PackageState::NotInstalled | PackageState::HalfRemoved => Ok(()),
                };
            }
            // NoMatch: fall through to pass 2.
        }

        // Pass 2: already queued in this transaction?
        if txn
            .unsorted_deps
            .values()
            .any(|entry| entry.record.provides_pattern(pattern))
        {
            return Ok(());
        }
        if let Some(queued) = txn.unsorted_deps.get(pattern.name()) {
            if pattern.matches(&queued.record.version) {
                return Ok(());
            }
            if let Some((_, required)) = pattern.constraint()
                && required.cmp_xbps(&queued.record.version) == Ordering::Greater
            {
                return Err(Error::ConstraintConflict {
                    name: pattern.name().clone(),
                    queued_version: queued.record.version.clone(),
                    required: pattern.clone(),
                });
            }
            // The queued entry wins; never downgrade an already-queued entry.
            return Ok(());
        }

        // Pass 3: available in the repository pool?
        let candidate = self
            .repos
            .find_virtualpkg(pattern)
            .or_else(|| self.repos.find_pkg(pattern));
        let Some(candidate) = candidate else {
            self.record_missing(txn, pattern.clone());
            return Ok(());
        };
        let candidate = candidate.clone();

        // Pass 4: classify the action and queue it, then recurse into its own run-depends.
        let action = self.classify_action(&candidate);
        trace!("{}: found {} in repository, action={action}", pattern, candidate.pkgver);
        self.enqueue(txn, candidate.clone(), action, true, false);
        self.resolve_rundeps(txn, &candidate, depth + 1)
    }

    fn classify_action(&self, candidate: &PackageRecord) -> Action {
        match self.pkgdb.find_installed(&candidate.name) {
            None => Action::Install,
            Some(installed) => match installed.state {
                PackageState::Installed => Action::Update,
                PackageState::Unpacked | PackageState::NotInstalled | PackageState::HalfRemoved => {
                    Action::Install
                }
            },
        }
    }

    fn enqueue(
        &self,
        txn: &mut Transaction,
        record: PackageRecord,
        action: Action,
        automatic: bool,
        forced: bool,
    ) {
        txn.unsorted_deps.insert(
            record.name.clone(),
            TransactionEntry {
                record,
                action,
                automatic,
                forced,
            },
        );
    }

    fn record_missing(&self, txn: &mut Transaction, pattern: DependencyPattern) {
        let existing_idx = txn
            .missing_deps
            .iter()
            .position(|p| p.name() == pattern.name());
        let Some(idx) = existing_idx else {
            txn.missing_deps.push(pattern);
            return;
        };
        let (Some((_, existing_version)), Some((_, new_version))) =
            (txn.missing_deps[idx].constraint(), pattern.constraint())
        else {
            return;
        };
        if new_version.cmp_xbps(existing_version) == Ordering::Greater {
            txn.missing_deps[idx] = pattern;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, str::FromStr};

    use testresult::TestResult;
    use xbps_pkgdb::{PackageRecord, PackageState};
    use xbps_repo::Repository;
    use xbps_types::{Name, Version};

    use super::*;

    fn write_repo_entry(dir: &std::path::Path, record: &PackageRecord) {
        let entry_dir = dir.join(format!("{}-{}", record.name, record.version));
        fs::create_dir_all(&entry_dir).unwrap();
        fs::write(entry_dir.join("pkg.meta"), record.to_meta()).unwrap();
    }

    fn record(name: &str, version: &str, run_depends: &[&str]) -> PackageRecord {
        PackageRecord {
            name: Name::new(name).unwrap(),
            version: Version::from_str(version).unwrap(),
            pkgver: format!("{name}-{version}"),
            run_depends: run_depends
                .iter()
                .map(|p| DependencyPattern::from_str(p).unwrap())
                .collect(),
            provides: vec![],
            replaces: vec![],
            conflicts: vec![],
            repository: "repo".to_string(),
            automatic: false,
            state: PackageState::NotInstalled,
        }
    }

    #[test]
    fn installs_root_and_its_transitive_deps() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let pkgdb = PkgDB::create(tmp.path().join("pkgdb"))?;

        let repo_dir = tmp.path().join("repo");
        write_repo_entry(&repo_dir, &record("foo", "1.0-1", &["bar>=1.0"]));
        write_repo_entry(&repo_dir, &record("bar", "1.0-1", &[]));
        let mut pool = RepoPool::new();
        pool.push(Repository::load("main", &repo_dir)?);

        let builder = TransactionBuilder::new(&pkgdb, &pool);
        let mut txn = Transaction::new();
        builder.add_root(&mut txn, &DependencyPattern::from_str("foo")?)?;

        assert_eq!(txn.unsorted_deps.len(), 2);
        let foo = &txn.unsorted_deps[&Name::new("foo")?];
        assert_eq!(foo.action, Action::Install);
        assert!(!foo.automatic);
        let bar = &txn.unsorted_deps[&Name::new("bar")?];
        assert_eq!(bar.action, Action::Install);
        assert!(bar.automatic);
        assert!(txn.missing_deps.is_empty());
        Ok(())
    }

    #[test]
    fn installed_and_matching_is_skipped() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path().join("pkgdb"))?;
        let mut installed_bar = record("bar", "1.0-1", &[]);
        installed_bar.state = PackageState::Installed;
        pkgdb.insert(installed_bar)?;

        let repo_dir = tmp.path().join("repo");
        write_repo_entry(&repo_dir, &record("foo", "1.0-1", &["bar>=1.0"]));
        let mut pool = RepoPool::new();
        pool.push(Repository::load("main", &repo_dir)?);

        let builder = TransactionBuilder::new(&pkgdb, &pool);
        let mut txn = Transaction::new();
        builder.add_root(&mut txn, &DependencyPattern::from_str("foo")?)?;

        assert_eq!(txn.unsorted_deps.len(), 1);
        assert!(!txn.unsorted_deps.contains_key(&Name::new("bar")?));
        Ok(())
    }

    #[test]
    fn unpacked_match_is_queued_for_configure() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path().join("pkgdb"))?;
        let mut installed_bar = record("bar", "1.0-1", &[]);
        installed_bar.state = PackageState::Unpacked;
        pkgdb.insert(installed_bar)?;

        let repo_dir = tmp.path().join("repo");
        write_repo_entry(&repo_dir, &record("foo", "1.0-1", &["bar>=1.0"]));
        let mut pool = RepoPool::new();
        pool.push(Repository::load("main", &repo_dir)?);

        let builder = TransactionBuilder::new(&pkgdb, &pool);
        let mut txn = Transaction::new();
        builder.add_root(&mut txn, &DependencyPattern::from_str("foo")?)?;

        let bar = &txn.unsorted_deps[&Name::new("bar")?];
        assert_eq!(bar.action, Action::Configure);
        Ok(())
    }

    #[test]
    fn missing_dependency_is_recorded_not_fatal() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let pkgdb = PkgDB::create(tmp.path().join("pkgdb"))?;

        let repo_dir = tmp.path().join("repo");
        write_repo_entry(&repo_dir, &record("foo", "1.0-1", &["ghost>=1.0"]));
        let mut pool = RepoPool::new();
        pool.push(Repository::load("main", &repo_dir)?);

        let builder = TransactionBuilder::new(&pkgdb, &pool);
        let mut txn = Transaction::new();
        builder.add_root(&mut txn, &DependencyPattern::from_str("foo")?)?;

        assert_eq!(txn.missing_deps.len(), 1);
        assert_eq!(txn.missing_deps[0].name().as_str(), "ghost");
        Ok(())
    }

    /// Writes a straight-line chain of `n` packages `p0 -> p1 -> ... -> p{n-1}` (`n - 1` links),
    /// each depending only on the next, and returns `p0`'s pattern.
    fn write_chain(repo_dir: &std::path::Path, n: usize) -> DependencyPattern {
        for i in 0..n {
            let deps: Vec<String> = if i + 1 < n { vec![format!("p{}", i + 1)] } else { vec![] };
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            write_repo_entry(repo_dir, &record(&format!("p{i}"), "1.0-1", &deps));
        }
        DependencyPattern::from_str("p0").unwrap()
    }

    #[test]
    fn depth_exceeding_max_depth_is_an_error() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let pkgdb = PkgDB::create(tmp.path().join("pkgdb"))?;
        let repo_dir = tmp.path().join("repo");
        // 512 links (513 packages): the 512th link pushes resolve_rundeps to depth == MAX_DEPTH.
        let root = write_chain(&repo_dir, MAX_DEPTH + 1);
        let mut pool = RepoPool::new();
        pool.push(Repository::load("main", &repo_dir)?);

        let builder = TransactionBuilder::new(&pkgdb, &pool);
        let mut txn = Transaction::new();
        let err = builder.add_root(&mut txn, &root).unwrap_err();
        assert!(matches!(err, Error::ResolverDepthExceeded));
        Ok(())
    }

    #[test]
    fn depth_at_max_depth_resolves() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let pkgdb = PkgDB::create(tmp.path().join("pkgdb"))?;
        let repo_dir = tmp.path().join("repo");
        // 511 links (512 packages): the last resolve_rundeps call sees depth == MAX_DEPTH - 1.
        let root = write_chain(&repo_dir, MAX_DEPTH);
        let mut pool = RepoPool::new();
        pool.push(Repository::load("main", &repo_dir)?);

        let builder = TransactionBuilder::new(&pkgdb, &pool);
        let mut txn = Transaction::new();
        builder.add_root(&mut txn, &root)?;
        assert_eq!(txn.unsorted_deps.len(), MAX_DEPTH);
        Ok(())
    }

    #[test]
    fn root_not_in_any_repository_is_an_error() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let pkgdb = PkgDB::create(tmp.path().join("pkgdb"))?;
        let pool = RepoPool::new();
        let builder = TransactionBuilder::new(&pkgdb, &pool);
        let mut txn = Transaction::new();

        let err = builder
            .add_root(&mut txn, &DependencyPattern::from_str("foo")?)
            .unwrap_err();
        assert!(matches!(err, Error::RepositoryMiss { .. }));
        Ok(())
    }
}

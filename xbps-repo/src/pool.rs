//! A priority-ordered collection of repositories.

use xbps_pkgdb::PackageRecord;
use xbps_types::DependencyPattern;

use crate::Repository;

/// A list of repositories in user-declared priority order.
///
/// Lookups iterate repositories in order and return the first hit; [`RepoPool::find_pkg_best`]
/// instead scans every repository and returns the highest-versioned match.
#[derive(Debug, Default)]
pub struct RepoPool {
    repositories: Vec<Repository>,
}

impl RepoPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a repository to the end of the priority order (lowest priority).
    pub fn push(&mut self, repository: Repository) {
        self.repositories.push(repository);
    }

    /// The repositories in priority order, highest first.
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// Returns the first repository (in priority order) with a real package matching `pattern`.
    ///
    /// This is the lookup `TransactionBuilder` Pass 3 uses: first-in-pool-wins, never
    /// best-version, matching `xbps_repository_pool_find_pkg(reqpkg, true, false)`.
    pub fn find_pkg(&self, pattern: &DependencyPattern) -> Option<&PackageRecord> {
        self.repositories
            .iter()
            .find_map(|repo| repo.find_pkg(pattern))
    }

    /// Returns the first repository (in priority order) providing `pattern` as a virtual package.
    pub fn find_virtualpkg(&self, pattern: &DependencyPattern) -> Option<&PackageRecord> {
        self.repositories
            .iter()
            .find_map(|repo| repo.find_virtualpkg(pattern))
    }

    /// Scans every repository and returns the highest-versioned record matching `pattern` by real
    /// name. Exposed for callers that explicitly want "best version across all repos" semantics;
    /// the resolver itself never uses this mode.
    pub fn find_pkg_best(&self, pattern: &DependencyPattern) -> Option<&PackageRecord> {
        self.repositories
            .iter()
            .filter_map(|repo| repo.find_pkg(pattern))
            .max_by(|a, b| a.version.cmp_xbps(&b.version))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, str::FromStr};

    use testresult::TestResult;
    use xbps_pkgdb::{PackageRecord, PackageState, PkgDB};
    use xbps_types::{Name, Version};

    use super::*;

    fn write_repo_entry(dir: &std::path::Path, record: &PackageRecord) {
        let entry_dir = dir.join(format!("{}-{}", record.name, record.version));
        fs::create_dir_all(&entry_dir).unwrap();
        fs::write(entry_dir.join("pkg.meta"), record.to_meta()).unwrap();
    }

    fn sample(name: &str, version: &str) -> PackageRecord {
        PackageRecord {
            name: Name::new(name).unwrap(),
            version: Version::from_str(version).unwrap(),
            pkgver: format!("{name}-{version}"),
            run_depends: vec![],
            provides: vec![],
            replaces: vec![],
            conflicts: vec![],
            repository: String::new(),
            automatic: false,
            state: PackageState::Installed,
        }
    }

    #[test]
    fn first_in_pool_wins() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let repo_a = tmp.path().join("a");
        let repo_b = tmp.path().join("b");
        write_repo_entry(&repo_a, &sample("foo", "1.0-1"));
        write_repo_entry(&repo_b, &sample("foo", "2.0-1"));

        // Ensure both indexes parse (exercises PkgDB's read-only load path).
        PkgDB::open_readonly(&repo_a)?;
        PkgDB::open_readonly(&repo_b)?;

        let mut pool = RepoPool::new();
        pool.push(Repository::load("a", &repo_a)?);
        pool.push(Repository::load("b", &repo_b)?);

        let pattern = DependencyPattern::from_str("foo")?;
        let found = pool.find_pkg(&pattern).expect("missing foo");
        assert_eq!(found.version, Version::from_str("1.0-1")?);

        let best = pool.find_pkg_best(&pattern).expect("missing foo");
        assert_eq!(best.version, Version::from_str("2.0-1")?);
        Ok(())
    }
}

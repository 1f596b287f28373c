//! Pre-computation of recursive and orphan removals.
//!
//! Both computations are the responsibility of the planner, not the driver (§4.6): the driver only
//! ever executes the entries it is handed.

use std::collections::BTreeSet;

use xbps_pkgdb::PkgDB;
use xbps_types::Name;

/// Given a set of requested removals, returns the additional package names that would become
/// orphaned (installed `automatic=true`, and depended on only by packages already slated for
/// removal), iterated to a fixed point. Does not include the requested names themselves.
pub fn compute_recursive_removals(pkgdb: &PkgDB, requested: &[Name]) -> Vec<Name> {
    let to_remove = fixed_point(pkgdb, requested.iter().cloned().collect());
    to_remove
        .into_iter()
        .filter(|name| !requested.contains(name))
        .collect()
}

/// Returns every installed package that is `automatic=true` with an empty reverse-dependency set,
/// iterated to a fixed point as removing one orphan may orphan another.
pub fn compute_orphans(pkgdb: &PkgDB) -> Vec<Name> {
    fixed_point(pkgdb, BTreeSet::new()).into_iter().collect()
}

fn fixed_point(pkgdb: &PkgDB, mut to_remove: BTreeSet<Name>) -> BTreeSet<Name> {
    loop {
        let mut added = false;
        for record in pkgdb.entries() {
            if !record.automatic || to_remove.contains(&record.name) {
                continue;
            }
            let revdeps = pkgdb.revdeps_of(&record.name);
            if revdeps.iter().all(|dependent| to_remove.contains(dependent)) {
                to_remove.insert(record.name.clone());
                added = true;
            }
        }
        if !added {
            return to_remove;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use testresult::TestResult;
    use xbps_pkgdb::{PackageRecord, PackageState};
    use xbps_types::{DependencyPattern, Version};

    use super::*;

    fn record(name: &str, run_depends: &[&str], automatic: bool) -> PackageRecord {
        PackageRecord {
            name: Name::new(name).unwrap(),
            version: Version::from_str("1.0-1").unwrap(),
            pkgver: format!("{name}-1.0-1"),
            run_depends: run_depends
                .iter()
                .map(|p| DependencyPattern::from_str(p).unwrap())
                .collect(),
            provides: vec![],
            replaces: vec![],
            conflicts: vec![],
            repository: String::new(),
            automatic,
            state: PackageState::Installed,
        }
    }

    #[test]
    fn recursive_removal_collects_automatic_transitive_deps() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        pkgdb.insert(record("foo", &["bar"], false))?;
        pkgdb.insert(record("bar", &["baz"], true))?;
        pkgdb.insert(record("baz", &[], true))?;

        let extra = compute_recursive_removals(&pkgdb, &[Name::new("foo")?]);
        let mut extra_strs: Vec<&str> = extra.iter().map(|n| n.as_str()).collect();
        extra_strs.sort_unstable();
        assert_eq!(extra_strs, vec!["bar", "baz"]);
        Ok(())
    }

    #[test]
    fn recursive_removal_stops_at_manually_installed_or_shared_deps() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        pkgdb.insert(record("foo", &["shared"], false))?;
        pkgdb.insert(record("other", &["shared"], false))?;
        pkgdb.insert(record("shared", &[], true))?;

        let extra = compute_recursive_removals(&pkgdb, &[Name::new("foo")?]);
        assert!(extra.is_empty());
        Ok(())
    }

    #[test]
    fn orphans_finds_automatic_with_no_revdeps() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        pkgdb.insert(record("leftover", &[], true))?;
        pkgdb.insert(record("manual", &[], false))?;

        let orphans = compute_orphans(&pkgdb);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].as_str(), "leftover");
        Ok(())
    }

    #[test]
    fn no_orphans_is_empty_not_an_error() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        pkgdb.insert(record("manual", &[], false))?;

        assert!(compute_orphans(&pkgdb).is_empty());
        Ok(())
    }
}

//! Integration tests for the `xbps-remove` CLI.

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use testresult::TestResult;
use xbps_pkgdb::{PackageRecord, PackageState, PkgDB};
use xbps_types::{DependencyPattern, Name, Version};
use std::str::FromStr;

fn record(name: &str, run_depends: &[&str]) -> PackageRecord {
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
        automatic: false,
        state: PackageState::Installed,
    }
}

fn seed_pkgdb(rootdir: &Path, records: &[PackageRecord]) -> TestResult {
    let db_dir = rootdir.join("var/db/xbps/pkgdb");
    let mut db = PkgDB::create(&db_dir)?;
    for record in records {
        db.insert(record.clone())?;
    }
    // PkgDB's lock is released on drop, letting the CLI process acquire it in turn.
    drop(db);
    Ok(())
}

#[test]
fn removes_an_installed_package() -> TestResult {
    let tmp = tempfile::tempdir()?;
    seed_pkgdb(tmp.path(), &[record("foo", &[])])?;

    let mut cmd = cargo_bin_cmd!("xbps-remove");
    cmd.args(["-y", "-r", &tmp.path().to_string_lossy(), "foo"]);
    cmd.assert().success();

    let db = PkgDB::open_readonly(tmp.path().join("var/db/xbps/pkgdb"))?;
    assert!(db.find_installed(&Name::new("foo")?).is_none());
    Ok(())
}

#[test]
fn refuses_to_remove_unknown_package() -> TestResult {
    let tmp = tempfile::tempdir()?;
    seed_pkgdb(tmp.path(), &[])?;

    let mut cmd = cargo_bin_cmd!("xbps-remove");
    cmd.args(["-y", "-r", &tmp.path().to_string_lossy(), "nonexistent"]);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn blocked_by_revdeps_exits_eexist() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let mut dependant = record("foo", &["bar"]);
    dependant.state = PackageState::Installed;
    seed_pkgdb(tmp.path(), &[record("bar", &[]), dependant])?;

    let mut cmd = cargo_bin_cmd!("xbps-remove");
    cmd.args(["-y", "-r", &tmp.path().to_string_lossy(), "bar"]);
    let assert = cmd.assert().code(17);
    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("IS REQUIRED BY"));
    Ok(())
}

#[test]
fn force_revdeps_overrides_block() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let mut dependant = record("foo", &["bar"]);
    dependant.state = PackageState::Installed;
    seed_pkgdb(tmp.path(), &[record("bar", &[]), dependant])?;

    let mut cmd = cargo_bin_cmd!("xbps-remove");
    cmd.args(["-y", "-F", "-r", &tmp.path().to_string_lossy(), "bar"]);
    cmd.assert().success();
    Ok(())
}

#[test]
fn dry_run_never_mutates_pkgdb() -> TestResult {
    let tmp = tempfile::tempdir()?;
    seed_pkgdb(tmp.path(), &[record("foo", &[])])?;

    let mut cmd = cargo_bin_cmd!("xbps-remove");
    cmd.args(["-n", "-r", &tmp.path().to_string_lossy(), "foo"]);
    cmd.assert().success();

    let db = PkgDB::open_readonly(tmp.path().join("var/db/xbps/pkgdb"))?;
    assert!(db.find_installed(&Name::new("foo")?).is_some());
    Ok(())
}

#[test]
fn no_request_is_a_success_no_op() -> TestResult {
    let tmp = tempfile::tempdir()?;
    seed_pkgdb(tmp.path(), &[])?;

    let mut cmd = cargo_bin_cmd!("xbps-remove");
    cmd.args(["-y", "-r", &tmp.path().to_string_lossy()]);
    cmd.assert().success();
    Ok(())
}

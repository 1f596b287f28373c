//! Executes an ordered transaction plan, one entry at a time.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering as AtomicOrdering},
};

use log::{info, warn};
use xbps_pkgdb::{PackageState, PkgDB};
use xbps_resolver::{Action, TransactionEntry};

use crate::{
    Error,
    collaborator::Collaborator,
    events::{AutoremoveOutcome, Event, EventState, FileOutcome, Outcome},
    options::ExecuteOptions,
    planner,
};

/// Drives a sorted transaction plan to completion against a package database.
///
/// The core is single-threaded (§5): `execute` performs every step synchronously and never
/// suspends. Cancellation is cooperative, checked only between plan steps.
pub struct TransactionDriver<'a, C: Collaborator> {
    pkgdb: &'a mut PkgDB,
    collaborator: C,
    callback: Option<Box<dyn FnMut(Event)>>,
    cancelled: Arc<AtomicBool>,
}

impl<'a, C: Collaborator> TransactionDriver<'a, C> {
    /// Creates a driver over `pkgdb`, using `collaborator` for file-level work.
    pub fn new(pkgdb: &'a mut PkgDB, collaborator: C) -> Self {
        Self {
            pkgdb,
            collaborator,
            callback: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers a state callback, replacing any previously registered one.
    pub fn on_event(&mut self, callback: impl FnMut(Event) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Returns a handle that can be used to cooperatively cancel an in-progress `execute` call
    /// from another thread or a signal handler.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn emit(&mut self, event: Event) {
        if let Some(callback) = self.callback.as_mut() {
            callback(event);
        }
    }

    /// Executes `plan` in order.
    ///
    /// Every removal in the plan is attempted even if an earlier one was blocked by reverse
    /// dependencies, so the caller sees every blocker in one pass (§4.6).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the cancellation flag is set between steps, or any error
    /// raised while mutating the database.
    pub fn execute(
        &mut self,
        plan: &[TransactionEntry],
        options: &ExecuteOptions,
    ) -> Result<Outcome, Error> {
        let mut blocked = Vec::new();
        for entry in plan {
            if self.cancelled.load(AtomicOrdering::Relaxed) {
                return Err(Error::Cancelled);
            }
            match entry.action {
                Action::Remove | Action::HoldRemove => {
                    if let Some(block) = self.execute_removal(entry, options)? {
                        blocked.push(block);
                    }
                }
                Action::Install => self.execute_install(entry, options)?,
                Action::Update => self.execute_update(entry, options)?,
                Action::Configure => self.execute_configure(entry, options)?,
            }
        }
        if blocked.is_empty() {
            Ok(Outcome::Success)
        } else {
            Ok(Outcome::RemovalBlocked { blocked })
        }
    }

    /// Computes the current set of orphaned packages and removes them.
    ///
    /// Finding no orphans is reported as [`AutoremoveOutcome::NoOrphans`], a distinct success, not
    /// an error (§4.6, resolving the `autoremove`-with-nothing-to-do open question).
    ///
    /// # Errors
    ///
    /// Returns any error raised while executing the generated removal plan.
    pub fn execute_autoremove(
        &mut self,
        options: &ExecuteOptions,
    ) -> Result<AutoremoveOutcome, Error> {
        let orphans = planner::compute_orphans(self.pkgdb);
        if orphans.is_empty() {
            return Ok(AutoremoveOutcome::NoOrphans);
        }
        // `compute_orphans` returns a closed fixed point: every member's revdeps are either empty
        // or themselves in the set. The set is not topologically sorted, so a live PreCheck against
        // `pkgdb.revdeps_of` would spuriously block an orphan whose only revdep is a same-run
        // orphan still awaiting its own removal; `forced` skips that check for this closed set.
        let plan: Vec<TransactionEntry> = orphans
            .iter()
            .filter_map(|name| self.pkgdb.find_installed(name))
            .cloned()
            .map(|record| TransactionEntry {
                record,
                action: Action::Remove,
                automatic: true,
                forced: true,
            })
            .collect();
        let outcome = self.execute(&plan, options)?;
        Ok(AutoremoveOutcome::Removed(outcome))
    }

    fn execute_removal(
        &mut self,
        entry: &TransactionEntry,
        options: &ExecuteOptions,
    ) -> Result<Option<(xbps_types::Name, Vec<xbps_types::Name>)>, Error> {
        let name = entry.name().clone();
        self.emit(Event::progress(EventState::Remove, entry.record.pkgver.clone()));

        // PreCheck: block on reverse dependencies unless overridden.
        let revdeps = self.pkgdb.revdeps_of(&name);
        if !revdeps.is_empty() && !options.force_revdeps && !entry.forced {
            let revdeps: Vec<_> = revdeps.into_iter().collect();
            warn!(
                "{} is required by {} package(s)",
                entry.record.pkgver,
                revdeps.len()
            );
            self.emit(Event::failure(
                EventState::RemoveFail,
                entry.record.pkgver.clone(),
                format!("required by {} package(s)", revdeps.len()),
            ));
            return Ok(Some((name, revdeps)));
        }

        if options.dry_run {
            self.emit(Event::progress(EventState::RemoveDone, entry.record.pkgver.clone()));
            return Ok(None);
        }

        // Unlink: per-file, ENOTEMPTY is tolerated and non-fatal.
        let outcomes: Vec<FileOutcome> = self.collaborator.unlink(&entry.record);
        for outcome in outcomes {
            match outcome.error {
                None if options.verbose => {
                    self.emit(Event::progress(
                        EventState::RemoveFile,
                        outcome.path.display().to_string(),
                    ));
                }
                None => {}
                Some(_) if outcome.not_empty => {
                    self.emit(Event::progress(
                        EventState::RemoveFileObsolete,
                        outcome.path.display().to_string(),
                    ));
                }
                Some(err) => {
                    self.emit(Event::failure(
                        EventState::RemoveFileFail,
                        outcome.path.display().to_string(),
                        err.to_string(),
                    ));
                }
            }
        }

        // Metadata: drop the record and its revdeps entries.
        self.pkgdb.remove(&name)?;
        info!("{} removed", entry.record.pkgver);
        self.emit(Event::progress(EventState::RemoveDone, entry.record.pkgver.clone()));
        Ok(None)
    }

    fn execute_install(&mut self, entry: &TransactionEntry, options: &ExecuteOptions) -> Result<(), Error> {
        self.emit(Event::progress(EventState::Install, entry.record.pkgver.clone()));
        if options.dry_run {
            return Ok(());
        }
        self.collaborator
            .install(&entry.record)
            .map_err(|reason| Error::CollaboratorFailed {
                name: entry.name().clone(),
                reason,
            })?;
        let mut record = entry.record.clone();
        record.state = PackageState::Installed;
        record.automatic = entry.automatic;
        self.pkgdb.insert(record)?;
        Ok(())
    }

    fn execute_update(&mut self, entry: &TransactionEntry, options: &ExecuteOptions) -> Result<(), Error> {
        self.emit(Event::progress(EventState::Update, entry.record.pkgver.clone()));
        if options.dry_run {
            return Ok(());
        }
        self.collaborator
            .update(&entry.record)
            .map_err(|reason| Error::CollaboratorFailed {
                name: entry.name().clone(),
                reason,
            })?;
        let mut record = entry.record.clone();
        record.state = PackageState::Installed;
        record.automatic = entry.automatic;
        self.pkgdb.insert(record)?;
        Ok(())
    }

    fn execute_configure(
        &mut self,
        entry: &TransactionEntry,
        options: &ExecuteOptions,
    ) -> Result<(), Error> {
        self.emit(Event::progress(EventState::Configure, entry.record.pkgver.clone()));
        if options.dry_run {
            return Ok(());
        }
        self.collaborator
            .configure(&entry.record)
            .map_err(|reason| Error::CollaboratorFailed {
                name: entry.name().clone(),
                reason,
            })?;
        self.pkgdb.set_state(entry.name(), PackageState::Installed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use testresult::TestResult;
    use xbps_pkgdb::PackageRecord;
    use xbps_types::{DependencyPattern, Name, Version};

    use super::*;
    use crate::collaborator::NoopCollaborator;

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
            state: PackageState::NotInstalled,
        }
    }

    fn entry(record: PackageRecord, action: Action) -> TransactionEntry {
        TransactionEntry {
            record,
            action,
            automatic: false,
            forced: false,
        }
    }

    #[test]
    fn install_then_remove_roundtrips() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        let options = ExecuteOptions::default();

        {
            let mut driver = TransactionDriver::new(&mut pkgdb, NoopCollaborator);
            let outcome = driver.execute(&[entry(record("foo", &[]), Action::Install)], &options)?;
            assert!(matches!(outcome, Outcome::Success));
        }
        assert!(pkgdb.find_installed(&Name::new("foo")?).is_some());

        {
            let mut driver = TransactionDriver::new(&mut pkgdb, NoopCollaborator);
            let outcome = driver.execute(&[entry(record("foo", &[]), Action::Remove)], &options)?;
            assert!(matches!(outcome, Outcome::Success));
        }
        assert!(pkgdb.find_installed(&Name::new("foo")?).is_none());
        Ok(())
    }

    #[test]
    fn removal_blocked_by_revdeps_reports_and_continues() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        pkgdb.insert(record("bar", &[]))?;
        let mut dependant = record("foo", &["bar"]);
        dependant.state = PackageState::Installed;
        pkgdb.insert(dependant)?;

        let mut driver = TransactionDriver::new(&mut pkgdb, NoopCollaborator);
        let plan = vec![
            entry(record("bar", &[]), Action::Remove),
            entry(record("baz", &[]), Action::Install),
        ];
        let outcome = driver.execute(&plan, &ExecuteOptions::default())?;
        match outcome {
            Outcome::RemovalBlocked { blocked } => {
                assert_eq!(blocked.len(), 1);
                assert_eq!(blocked[0].0.as_str(), "bar");
            }
            Outcome::Success => panic!("expected removal to be blocked"),
        }
        // The install entry after the blocked removal was still attempted.
        assert!(pkgdb.find_installed(&Name::new("baz")?).is_some());
        Ok(())
    }

    #[test]
    fn force_revdeps_allows_removal() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        pkgdb.insert(record("bar", &[]))?;
        let mut dependant = record("foo", &["bar"]);
        dependant.state = PackageState::Installed;
        pkgdb.insert(dependant)?;

        let mut driver = TransactionDriver::new(&mut pkgdb, NoopCollaborator);
        let options = ExecuteOptions {
            force_revdeps: true,
            ..Default::default()
        };
        let outcome = driver.execute(&[entry(record("bar", &[]), Action::Remove)], &options)?;
        assert!(matches!(outcome, Outcome::Success));
        Ok(())
    }

    #[test]
    fn dry_run_never_mutates_pkgdb() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        let mut driver = TransactionDriver::new(&mut pkgdb, NoopCollaborator);
        let options = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        driver.execute(&[entry(record("foo", &[]), Action::Install)], &options)?;
        assert!(pkgdb.find_installed(&Name::new("foo")?).is_none());
        Ok(())
    }

    #[test]
    fn autoremove_with_no_orphans_is_not_an_error() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        let mut driver = TransactionDriver::new(&mut pkgdb, NoopCollaborator);
        let outcome = driver.execute_autoremove(&ExecuteOptions::default())?;
        assert!(matches!(outcome, AutoremoveOutcome::NoOrphans));
        Ok(())
    }

    #[test]
    fn autoremove_removes_dependent_orphan_chain_regardless_of_name_order() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let mut pkgdb = PkgDB::create(tmp.path())?;
        // Alphabetically "bbb" sorts before "zzz", but "zzz" is the one that depends on "bbb".
        // A name-sorted, unordered removal would process "bbb" first and see "zzz" still live as
        // a revdep; both are orphans, so neither may be spuriously blocked.
        let mut bbb = record("bbb", &[]);
        bbb.automatic = true;
        bbb.state = PackageState::Installed;
        pkgdb.insert(bbb)?;
        let mut zzz = record("zzz", &["bbb"]);
        zzz.automatic = true;
        zzz.state = PackageState::Installed;
        pkgdb.insert(zzz)?;

        let mut driver = TransactionDriver::new(&mut pkgdb, NoopCollaborator);
        let outcome = driver.execute_autoremove(&ExecuteOptions::default())?;
        match outcome {
            AutoremoveOutcome::Removed(Outcome::Success) => {}
            other => panic!("expected both orphans removed cleanly, got {other:?}"),
        }
        assert!(pkgdb.find_installed(&Name::new("bbb")?).is_none());
        assert!(pkgdb.find_installed(&Name::new("zzz")?).is_none());
        Ok(())
    }
}

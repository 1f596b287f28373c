//! The embedder API (§6): the surface the CLI front-end is itself just one consumer of.

use std::collections::BTreeMap;

use xbps_pkgdb::PkgDB;
use xbps_repo::RepoPool;
use xbps_resolver::{Transaction, TransactionBuilder, TransactionSorter};
use xbps_transaction::{
    Action, AutoremoveOutcome, Collaborator, Event, ExecuteOptions, Outcome, TransactionDriver,
    TransactionEntry,
};
use xbps_types::{DependencyPattern, Name};

use crate::{Config, Error};

struct PendingRemove {
    name: Name,
    recursive: bool,
}

struct PendingInstall {
    pattern: DependencyPattern,
    automatic: bool,
}

/// One embedder session: a configuration, an owned package database handle, and a repository
/// pool, plus the transaction queued against it since the last [`Handle::exec_transaction`].
pub struct Handle {
    config: Config,
    pkgdb: PkgDB,
    locked: bool,
    repos: RepoPool,
    pending_removes: Vec<PendingRemove>,
    pending_installs: Vec<PendingInstall>,
    autoremove: bool,
    callback: Option<Box<dyn FnMut(Event)>>,
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("config", &self.config)
            .field("locked", &self.locked)
            .field("pending_removes", &self.pending_removes.len())
            .field("pending_installs", &self.pending_installs.len())
            .field("autoremove", &self.autoremove)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for PendingRemove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.recursive)
    }
}

impl std::fmt::Debug for PendingInstall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.pattern, self.automatic)
    }
}

impl Handle {
    /// Opens a session against `config`: merges the conffile, opens the package database
    /// read-only (the mutation lock is only taken by [`Handle::pkgdb_lock`]), and loads every
    /// repository found under `config.repodata_dir()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigIo`]/[`Error::ConfigMalformed`] if the conffile cannot be read, or
    /// a wrapped [`xbps_pkgdb::Error`]/[`xbps_repo::Error`] if the database or a repository index
    /// cannot be loaded.
    pub fn init(config: Config) -> Result<Self, Error> {
        let config = config.load_conffile()?;
        let pkgdb = PkgDB::open_readonly(config.pkgdb_dir())?;
        let repos = load_repos(&config)?;
        Ok(Self {
            config,
            pkgdb,
            locked: false,
            repos,
            pending_removes: Vec::new(),
            pending_installs: Vec::new(),
            autoremove: false,
            callback: None,
        })
    }

    /// This session's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The package database this session is driving, for read-only lookups (e.g. resolving a
    /// blocked removal's revdeps back to their `pkgver` strings for display).
    pub fn pkgdb(&self) -> &PkgDB {
        &self.pkgdb
    }

    /// Acquires the package database's mutation lock, reopening it read-write.
    ///
    /// # Errors
    ///
    /// Returns [`xbps_pkgdb::Error::DatabaseLocked`] if another process already holds it.
    pub fn pkgdb_lock(&mut self) -> Result<(), Error> {
        if self.locked {
            return Ok(());
        }
        self.pkgdb = PkgDB::open(self.config.pkgdb_dir())?;
        self.locked = true;
        Ok(())
    }

    /// Releases the package database's mutation lock, if held, reopening it read-only.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`xbps_pkgdb::Error`] if the database cannot be reopened read-only.
    pub fn pkgdb_unlock(&mut self) -> Result<(), Error> {
        if !self.locked {
            return Ok(());
        }
        self.pkgdb = PkgDB::open_readonly(self.config.pkgdb_dir())?;
        self.locked = false;
        Ok(())
    }

    /// Queues `name` for removal, optionally including its automatic-only transitive
    /// dependencies (`-R`/`--recursive`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PkgNotInstalled`] if `name` has no installed record.
    pub fn transaction_remove_pkg(&mut self, name: &Name, recursive: bool) -> Result<(), Error> {
        if self.pkgdb.find_installed(name).is_none() {
            return Err(Error::PkgNotInstalled(name.clone()));
        }
        self.pending_removes.push(PendingRemove {
            name: name.clone(),
            recursive,
        });
        Ok(())
    }

    /// Queues every current orphan (§4.6) for removal alongside whatever else is queued.
    pub fn transaction_autoremove_pkgs(&mut self) {
        self.autoremove = true;
    }

    /// Queues `pattern` for installation, resolved against the repository pool.
    pub fn transaction_install_pkg(&mut self, pattern: DependencyPattern, automatic: bool) {
        self.pending_installs.push(PendingInstall { pattern, automatic });
    }

    /// Registers a state callback, replacing any previously registered one.
    pub fn register_state_cb(&mut self, callback: impl FnMut(Event) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Builds the queued removals and installs into a single ordered plan and executes it.
    ///
    /// Removal order is the dual of install order: [`TransactionSorter`] places a dependency
    /// before its dependent (the correct order to install), so the removal half of the plan is
    /// built the same way and then reversed, placing each dependent's removal before the
    /// dependency it no longer needs.
    ///
    /// # Errors
    ///
    /// Returns any error raised while resolving dependencies, sorting the plan, or executing it.
    pub fn exec_transaction<C: Collaborator>(
        &mut self,
        collaborator: C,
        options: &ExecuteOptions,
    ) -> Result<Outcome, Error> {
        let mut plan = self.build_removal_plan(options)?;
        plan.extend(self.build_install_plan()?);

        let mut driver = TransactionDriver::new(&mut self.pkgdb, collaborator);
        if let Some(callback) = self.callback.take() {
            driver.on_event(move |event| (callback)(event));
        }
        let outcome = driver.execute(&plan, options)?;
        self.pending_removes.clear();
        self.pending_installs.clear();
        self.autoremove = false;
        Ok(outcome)
    }

    fn build_removal_plan(&self, options: &ExecuteOptions) -> Result<Vec<TransactionEntry>, Error> {
        let mut targets: BTreeMap<Name, bool> = BTreeMap::new();
        for pending in &self.pending_removes {
            targets.entry(pending.name.clone()).or_insert(false);
        }
        // Seeded with every recursive request at once: a dependency shared between two packages
        // requested together (e.g. `xbps-remove -R foo bar`) only becomes orphaned once both of
        // its revdeps are in the removal set, which a per-package fixed point would never see.
        let recursive_roots: Vec<Name> = self
            .pending_removes
            .iter()
            .filter(|pending| pending.recursive)
            .map(|pending| pending.name.clone())
            .collect();
        if !recursive_roots.is_empty() {
            let extra = xbps_transaction::planner::compute_recursive_removals(&self.pkgdb, &recursive_roots);
            for name in extra {
                targets.entry(name).or_insert(true);
            }
        }
        if self.autoremove {
            for name in xbps_transaction::planner::compute_orphans(&self.pkgdb) {
                targets.entry(name).or_insert(true);
            }
        }

        let mut txn = Transaction::new();
        for (name, automatic) in &targets {
            let Some(record) = self.pkgdb.find_installed(name) else {
                continue;
            };
            txn.unsorted_deps.insert(
                name.clone(),
                TransactionEntry {
                    record: record.clone(),
                    action: Action::Remove,
                    automatic: *automatic,
                    forced: options.force_revdeps,
                },
            );
        }
        let mut sorted = TransactionSorter::new().sort(&txn)?;
        sorted.reverse();
        Ok(sorted)
    }

    fn build_install_plan(&self) -> Result<Vec<TransactionEntry>, Error> {
        if self.pending_installs.is_empty() {
            return Ok(Vec::new());
        }
        let builder = TransactionBuilder::new(&self.pkgdb, &self.repos);
        let mut txn = Transaction::new();
        for pending in &self.pending_installs {
            builder.add_root(&mut txn, &pending.pattern)?;
            if pending.automatic
                && let Some(entry) = txn.unsorted_deps.get_mut(pending.pattern.name())
            {
                entry.automatic = true;
            }
        }
        Ok(TransactionSorter::new().sort(&txn)?)
    }

    /// Executes an autoremove-only pass, distinguishing "nothing to do" from a real removal.
    ///
    /// # Errors
    ///
    /// Returns any error raised while executing the generated removal plan.
    pub fn exec_autoremove<C: Collaborator>(
        &mut self,
        collaborator: C,
        options: &ExecuteOptions,
    ) -> Result<AutoremoveOutcome, Error> {
        let mut driver = TransactionDriver::new(&mut self.pkgdb, collaborator);
        if let Some(callback) = self.callback.take() {
            driver.on_event(move |event| (callback)(event));
        }
        Ok(driver.execute_autoremove(options)?)
    }
}

fn load_repos(config: &Config) -> Result<RepoPool, Error> {
    let mut pool = RepoPool::new();
    let Ok(entries) = std::fs::read_dir(config.repodata_dir()) else {
        return Ok(pool);
    };
    let mut dirs: Vec<std::path::PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    for dir in dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pool.push(xbps_repo::Repository::load(name, &dir)?);
    }
    Ok(pool)
}

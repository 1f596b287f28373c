//! The injected collaborator interface: the actual filesystem work the driver never does itself.
//!
//! Per scope, the driver only plans and sequences; "download/unpack for installs" and "file hash
//! verification + unlink for removes" are performed by whatever implements this trait.

use xbps_pkgdb::PackageRecord;

use crate::events::FileOutcome;

/// Performs the file-level work a transaction step requires.
///
/// A no-op implementation is valid (and is what dry-run effectively behaves like): the driver
/// drives state transitions and events regardless of what the collaborator actually does.
pub trait Collaborator {
    /// Downloads and unpacks `record`, or performs whatever install-side work is needed.
    fn install(&mut self, record: &PackageRecord) -> Result<(), String>;

    /// Updates `record` in place.
    fn update(&mut self, record: &PackageRecord) -> Result<(), String>;

    /// Runs `record`'s post-install step.
    fn configure(&mut self, record: &PackageRecord) -> Result<(), String>;

    /// Verifies and unlinks every file belonging to `record`, returning one outcome per file.
    ///
    /// A directory left non-empty (`ENOTEMPTY`) must be reported with `not_empty: true` rather
    /// than as a generic error; the driver treats that case as non-fatal.
    fn unlink(&mut self, record: &PackageRecord) -> Vec<FileOutcome>;
}

/// A [`Collaborator`] that performs no I/O and always reports success.
///
/// Used by callers that only want the plan's state transitions and events, and by tests.
#[derive(Debug, Default)]
pub struct NoopCollaborator;

impl Collaborator for NoopCollaborator {
    fn install(&mut self, _record: &PackageRecord) -> Result<(), String> {
        Ok(())
    }

    fn update(&mut self, _record: &PackageRecord) -> Result<(), String> {
        Ok(())
    }

    fn configure(&mut self, _record: &PackageRecord) -> Result<(), String> {
        Ok(())
    }

    fn unlink(&mut self, _record: &PackageRecord) -> Vec<FileOutcome> {
        Vec::new()
    }
}

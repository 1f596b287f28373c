//! Options controlling one [`crate::TransactionDriver::execute`] call.

/// Per-run options for [`crate::TransactionDriver::execute`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecuteOptions {
    /// Plan only: no PkgDB mutation, no lock acquisition, every mutation is replaced by an event.
    pub dry_run: bool,
    /// Skip interactive confirmation (meaningful only to the CLI collaborator, carried through for
    /// parity with the embedder API).
    pub assume_yes: bool,
    /// Force-remove files even where that would normally be refused.
    pub force_remove_files: bool,
    /// Proceed with a removal even if reverse dependencies exist.
    pub force_revdeps: bool,
    /// Emit a [`crate::events::EventState::RemoveFile`] event per file instead of only per package.
    pub verbose: bool,
}

//! Events emitted by the driver's state callback, and the outcome of a completed run.

use std::path::PathBuf;

use xbps_types::Name;

/// The category of event delivered to a registered state callback.
///
/// Mirrors the embedder API's `state` values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventState {
    /// A package is about to be removed.
    Remove,
    /// One file belonging to a package is about to be unlinked.
    RemoveFile,
    /// A file was left in place because its directory was not empty (`ENOTEMPTY`).
    RemoveFileObsolete,
    /// A package's removal completed successfully.
    RemoveDone,
    /// A package's removal failed.
    RemoveFail,
    /// Unlinking one file failed (and was not the tolerated `ENOTEMPTY` case).
    RemoveFileFail,
    /// A file's hash did not match the recorded manifest during removal verification.
    RemoveFileHashFail,
    /// Leaving an obsolete file in place itself failed.
    RemoveFileObsoleteFail,
    /// A package is being installed.
    Install,
    /// A package's post-install step is running.
    Configure,
    /// A package is being updated in place.
    Update,
    /// A package archive is being downloaded.
    Download,
    /// A package archive's signature/hash is being verified.
    Verify,
    /// A package archive is being unpacked.
    Unpack,
}

/// One event delivered to the driver's registered callback.
#[derive(Clone, Debug)]
pub struct Event {
    /// The kind of event.
    pub state: EventState,
    /// The `pkgver` of the package this event concerns.
    pub arg: String,
    /// A human-readable description, empty for routine progress events.
    pub desc: String,
    /// The error text, if this event reports a failure.
    pub err: Option<String>,
}

impl Event {
    /// Builds a routine (non-error) event.
    pub fn progress(state: EventState, arg: impl Into<String>) -> Self {
        Self {
            state,
            arg: arg.into(),
            desc: String::new(),
            err: None,
        }
    }

    /// Builds a failure event.
    pub fn failure(state: EventState, arg: impl Into<String>, err: impl Into<String>) -> Self {
        Self {
            state,
            arg: arg.into(),
            desc: String::new(),
            err: Some(err.into()),
        }
    }
}

/// One file encountered during the removal `Unlink` phase.
#[derive(Debug)]
pub struct FileOutcome {
    /// The file's path.
    pub path: PathBuf,
    /// `Some` if unlinking this file failed.
    pub error: Option<std::io::Error>,
    /// Whether the failure was `ENOTEMPTY`, which is tolerated and non-fatal.
    pub not_empty: bool,
}

/// The result of a completed [`crate::TransactionDriver::execute`] call.
#[derive(Debug)]
pub enum Outcome {
    /// Every entry in the plan completed.
    Success,
    /// One or more removals were blocked by reverse dependencies; every other entry in the plan
    /// was still attempted before returning.
    RemovalBlocked {
        /// The blocked removals, each paired with the revdeps that blocked it.
        blocked: Vec<(Name, Vec<Name>)>,
    },
}

/// The result of an orphan auto-removal pass, distinguished from an ordinary [`Outcome`] because
/// finding no orphans is success, not an error.
#[derive(Debug)]
pub enum AutoremoveOutcome {
    /// Orphans were found and removed (see the wrapped [`Outcome`]).
    Removed(Outcome),
    /// No orphans were found; nothing to do.
    NoOrphans,
}


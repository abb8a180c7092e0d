//! Single-file unblocking.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::UnblockError;
use crate::marker::{is_blocked, remove_marker, MarkerStore};

/// Result of unblocking one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "cause", rename_all = "snake_case")]
pub enum UnblockOutcome {
    /// The marker was present and has been removed.
    Unblocked,
    /// The file carried no marker; nothing was changed.
    AlreadyClean,
    /// The file does not exist (or vanished before it could be inspected).
    NotFound,
    /// Access control prevented inspecting or removing the marker.
    PermissionDenied,
    /// Any other failure, with its cause.
    Failed(String),
}

impl UnblockOutcome {
    /// `Unblocked` and `AlreadyClean` both leave the file in the desired state.
    pub fn is_success(&self) -> bool {
        matches!(self, UnblockOutcome::Unblocked | UnblockOutcome::AlreadyClean)
    }

    fn from_error(path: &Path, err: UnblockError) -> Self {
        match err {
            UnblockError::NotFound { .. } => UnblockOutcome::NotFound,
            ref e if e.is_permission_denied() => UnblockOutcome::PermissionDenied,
            // The file went away after it was enumerated.
            UnblockError::Inspection { ref source, .. } | UnblockError::Remove { ref source, .. }
                if source.kind() == io::ErrorKind::NotFound && !path.exists() =>
            {
                UnblockOutcome::NotFound
            }
            e => UnblockOutcome::Failed(e.to_string()),
        }
    }
}

/// Unblocks a single file.
///
/// Never fails: every problem is folded into the returned [`UnblockOutcome`].
/// Holds no state of its own, so disjoint paths can be unblocked concurrently.
pub fn unblock(store: &dyn MarkerStore, path: &Path) -> UnblockOutcome {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return UnblockOutcome::NotFound,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return UnblockOutcome::NotFound,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return UnblockOutcome::PermissionDenied,
        Err(e) => return UnblockOutcome::Failed(e.to_string()),
    }

    let outcome = match is_blocked(store, path) {
        Ok(false) => UnblockOutcome::AlreadyClean,
        Ok(true) => match remove_marker(store, path) {
            Ok(()) => UnblockOutcome::Unblocked,
            Err(e) => UnblockOutcome::from_error(path, e),
        },
        Err(e) => UnblockOutcome::from_error(path, e),
    };

    // Failures reach the user through the notifier; keep the log quiet.
    debug!(path = %path.display(), ?outcome, "unblock finished");
    outcome
}

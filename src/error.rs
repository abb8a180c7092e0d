use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the `unblock` crate.
pub type Result<T> = std::result::Result<T, UnblockError>;

/// The primary error type for all operations in the `unblock` crate.
///
/// Per-file problems encountered during a directory walk are converted into
/// [`crate::UnblockOutcome`] values instead of being returned; only failures
/// that end the whole invocation surface as this type.
#[derive(Debug, Error)]
pub enum UnblockError {
    /// The target path does not exist (or is not a regular file).
    #[error("file or folder not found: '{}'", .path.display())]
    NotFound { path: PathBuf },

    /// The marker query failed for a reason other than "marker absent".
    #[error("could not inspect marker on '{}': {source}", .path.display())]
    Inspection { path: PathBuf, source: io::Error },

    /// The marker deletion failed for a reason other than "already absent".
    #[error("could not remove marker from '{}': {source}", .path.display())]
    Remove { path: PathBuf, source: io::Error },

    /// A directory could not be listed during a walk.
    #[error("could not list directory '{}': {source}", .path.display())]
    SubtreeEnumeration { path: PathBuf, source: io::Error },

    /// The walk root is not a directory.
    #[error("not a directory: '{}'", .path.display())]
    NotADirectory { path: PathBuf },

    /// The configuration file could not be read.
    #[error("could not read config '{}': {source}", .path.display())]
    ConfigIo { path: PathBuf, source: io::Error },

    /// The configuration file is not valid TOML for [`crate::config::UnblockConfig`].
    #[error("invalid config '{}': {source}", .path.display())]
    ConfigParse { path: PathBuf, source: toml::de::Error },

    /// A context-menu registration step failed.
    #[error("context-menu {operation} failed: {message}")]
    Registrar { operation: &'static str, message: String },

    /// I/O error while writing or removing registration files.
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    /// The parallel worker pool could not be started.
    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The background walk worker panicked or was cancelled.
    #[error("walk worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl UnblockError {
    /// Whether the underlying OS error is an access-control failure.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            UnblockError::Inspection { source, .. }
            | UnblockError::Remove { source, .. }
            | UnblockError::SubtreeEnumeration { source, .. }
            | UnblockError::Io { source, .. } => source.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

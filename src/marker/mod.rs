//! Block-marker access.
//!
//! Every platform stores the "downloaded from the internet" marker somewhere
//! different: Windows keeps it in the `Zone.Identifier` alternate data stream,
//! macOS in the `com.apple.quarantine` extended attribute, and Linux browsers
//! write `user.xdg.origin.url` / `user.xdg.referrer.url`. The rest of the crate
//! only talks to a [`MarkerStore`], so the mechanism can be swapped (or faked
//! in tests with [`MemoryMarkerStore`]).
//!
//! [`is_blocked`] and [`remove_marker`] are the inspector/remover pair built on
//! top of a store. A store reports "marker absent" as `Ok(false)` / `Ok(())`;
//! everything it returns as `Err` is a real failure.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::UnblockConfig;
use crate::error::{Result, UnblockError};

mod memory;
pub use memory::MemoryMarkerStore;

#[cfg(windows)]
mod ads;
#[cfg(windows)]
pub use ads::ZoneIdentifierStore;

#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios"))]
mod xattr;
#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios"))]
pub use xattr::{default_attribute_names, XattrStore};

/// Capability interface over the platform's marker channel.
pub trait MarkerStore: Send + Sync {
    /// Returns `Ok(true)` if the marker is present on `path`.
    ///
    /// A missing marker channel must be reported as `Ok(false)`, never as an error.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Deletes the marker from `path`. Removing an absent marker succeeds.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Short human-readable name of the mechanism, used in logs.
    fn name(&self) -> &'static str;
}

impl<S: MarkerStore + ?Sized> MarkerStore for Arc<S> {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        (**self).exists(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Store for platforms without a block-marker concept: nothing is ever blocked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl MarkerStore for NoopStore {
    fn exists(&self, _path: &Path) -> io::Result<bool> {
        Ok(false)
    }

    fn remove(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Builds the marker store for the running platform.
#[cfg(windows)]
pub fn platform_store(_config: &UnblockConfig) -> Arc<dyn MarkerStore> {
    Arc::new(ZoneIdentifierStore)
}

/// Builds the marker store for the running platform.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios"))]
pub fn platform_store(config: &UnblockConfig) -> Arc<dyn MarkerStore> {
    let names = config
        .attributes
        .clone()
        .unwrap_or_else(default_attribute_names);
    Arc::new(XattrStore::new(names))
}

/// Builds the marker store for the running platform.
#[cfg(not(any(
    windows,
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
pub fn platform_store(_config: &UnblockConfig) -> Arc<dyn MarkerStore> {
    Arc::new(NoopStore)
}

/// Marker Inspector: reports whether `path` carries the block marker.
///
/// Fails with [`UnblockError::NotFound`] if `path` does not exist at call time,
/// and with [`UnblockError::Inspection`] for any query failure other than
/// "marker absent".
pub fn is_blocked(store: &dyn MarkerStore, path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(UnblockError::NotFound { path: path.to_path_buf() });
        }
        Err(source) => {
            return Err(UnblockError::Inspection { path: path.to_path_buf(), source });
        }
    }

    let blocked = store
        .exists(path)
        .map_err(|source| UnblockError::Inspection { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), store = store.name(), blocked, "inspected marker");
    Ok(blocked)
}

/// Marker Remover: deletes the block marker from `path`.
///
/// Idempotent: succeeds when the marker is already gone. Every other failure,
/// including the file itself having disappeared, is a [`UnblockError::Remove`].
pub fn remove_marker(store: &dyn MarkerStore, path: &Path) -> Result<()> {
    store
        .remove(path)
        .map_err(|source| UnblockError::Remove { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), store = store.name(), "removed marker");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_is_blocked_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = MemoryMarkerStore::new();
        let err = is_blocked(&store, &dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, UnblockError::NotFound { .. }));
    }

    #[test]
    fn test_is_blocked_reports_store_state() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("setup.exe");
        File::create(&path)?;

        let store = MemoryMarkerStore::new();
        assert!(!is_blocked(&store, &path)?);

        store.mark(&path);
        assert!(is_blocked(&store, &path)?);
        Ok(())
    }

    #[test]
    fn test_is_blocked_propagates_query_failure() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("locked.bin");
        File::create(&path)?;

        let store = MemoryMarkerStore::new();
        store.fail_inspection(&path, io::ErrorKind::PermissionDenied);
        let err = is_blocked(&store, &path).unwrap_err();
        assert!(matches!(err, UnblockError::Inspection { .. }));
        assert!(err.is_permission_denied());
        Ok(())
    }

    #[test]
    fn test_remove_marker_is_idempotent() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("clean.txt");
        File::create(&path)?;

        let store = MemoryMarkerStore::new();
        remove_marker(&store, &path)?;
        remove_marker(&store, &path)?;
        assert!(!is_blocked(&store, &path)?);
        Ok(())
    }

    #[test]
    fn test_remove_marker_surfaces_denial() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("readonly.txt");
        File::create(&path)?;

        let store = MemoryMarkerStore::new();
        store.mark(&path);
        store.deny_removal(&path);
        let err = remove_marker(&store, &path).unwrap_err();
        assert!(matches!(err, UnblockError::Remove { .. }));
        assert!(err.is_permission_denied());
        assert!(is_blocked(&store, &path)?);
        Ok(())
    }

    #[test]
    fn test_noop_store_never_blocks() {
        let store = NoopStore;
        assert!(!store.exists(Path::new("anything")).unwrap());
        assert!(store.remove(Path::new("anything")).is_ok());
    }
}

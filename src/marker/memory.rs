//! In-memory marker store.
//!
//! Keeps the set of "blocked" paths in a mutex-guarded map so the unblock
//! engine can be exercised without a filesystem that supports alternate data
//! streams or extended attributes. Failures can be injected per path.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::MarkerStore;

#[derive(Debug, Default)]
struct State {
    marked: HashSet<PathBuf>,
    denied: HashSet<PathBuf>,
    inspection_failures: HashMap<PathBuf, io::ErrorKind>,
}

/// A [`MarkerStore`] backed by memory instead of the filesystem.
///
/// Removal still checks that the primary file exists, like the platform stores do.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    state: Mutex<State>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches the marker to `path`.
    pub fn mark(&self, path: &Path) {
        self.state().marked.insert(path.to_path_buf());
    }

    /// Makes every removal on `path` fail with `PermissionDenied`.
    pub fn deny_removal(&self, path: &Path) {
        self.state().denied.insert(path.to_path_buf());
    }

    /// Makes every inspection of `path` fail with an error of `kind`.
    pub fn fail_inspection(&self, path: &Path, kind: io::ErrorKind) {
        self.state().inspection_failures.insert(path.to_path_buf(), kind);
    }

    /// Number of paths currently carrying the marker.
    pub fn marked_count(&self) -> usize {
        self.state().marked.len()
    }

    pub fn is_marked(&self, path: &Path) -> bool {
        self.state().marked.contains(path)
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        let state = self.state();
        if let Some(kind) = state.inspection_failures.get(path) {
            return Err(io::Error::new(*kind, "injected inspection failure"));
        }
        Ok(state.marked.contains(path))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if !path.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file does not exist"));
        }
        let mut state = self.state();
        if state.denied.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "access is denied"));
        }
        state.marked.remove(path);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

//! Recursive directory unblocking.
//!
//! The walk first counts every regular file under the root, then visits the
//! tree pre-order: the files of a directory (sorted by name) before its
//! subdirectories. Per-file failures and unreadable subdirectories are
//! recorded in the [`WalkResult`] and never stop the walk.
//!
//! In parallel mode the files of each directory are unblocked on a `rayon`
//! pool; the processed-file counter is then the only state shared between
//! workers and is updated atomically.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, UnblockError};
use crate::marker::MarkerStore;
use crate::unblock::{unblock, UnblockOutcome};

/// Outcome recorded for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: UnblockOutcome,
}

/// A directory that could not be listed; its subtree was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtreeFailure {
    pub path: PathBuf,
    pub cause: String,
}

/// Aggregate result of a directory walk.
#[derive(Debug, Clone, Serialize)]
pub struct WalkResult {
    pub root: PathBuf,
    /// Regular files found by the counting scan before processing. Files
    /// created or deleted while the walk runs make this differ from
    /// `outcomes.len()`.
    pub total_files: usize,
    /// Files that ended `Unblocked` or `AlreadyClean`.
    pub processed_files: usize,
    /// One entry per visited file, in visiting order.
    pub outcomes: Vec<FileOutcome>,
    pub subtree_failures: Vec<SubtreeFailure>,
}

impl WalkResult {
    /// `true` only if every visited file was unblocked or already clean and
    /// no subtree was skipped.
    pub fn all_succeeded(&self) -> bool {
        self.processed_files == self.visited_files() && self.subtree_failures.is_empty()
    }

    /// Number of files that received an outcome.
    pub fn visited_files(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of files that ended with exactly `outcome`.
    pub fn count(&self, outcome: &UnblockOutcome) -> usize {
        self.outcomes.iter().filter(|o| &o.outcome == outcome).count()
    }

    /// Outcomes that were neither `Unblocked` nor `AlreadyClean`.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success())
    }

    /// Looks up the outcome recorded for `path`.
    pub fn outcome_for(&self, path: &Path) -> Option<&UnblockOutcome> {
        self.outcomes.iter().find(|o| o.path == path).map(|o| &o.outcome)
    }
}

/// Event emitted while a walk is in progress.
#[derive(Debug)]
pub enum WalkEvent<'a> {
    File { path: &'a Path, outcome: &'a UnblockOutcome },
    SubtreeFailed { path: &'a Path, cause: &'a str },
}

/// Walk observer callback type.
pub type WalkCallback = dyn Fn(&WalkEvent<'_>) + Send + Sync;

/// Explicit accumulator threaded through the recursion.
#[derive(Default)]
struct WalkAccumulator {
    processed: AtomicUsize,
    outcomes: Vec<FileOutcome>,
    subtree_failures: Vec<SubtreeFailure>,
}

/// Walks a directory tree and unblocks every regular file in it.
pub struct TreeWalker {
    store: Arc<dyn MarkerStore>,
    pool: Option<rayon::ThreadPool>,
    observer: Option<Arc<WalkCallback>>,
}

impl TreeWalker {
    /// Creates a sequential walker over `store`.
    pub fn new(store: Arc<dyn MarkerStore>) -> Self {
        Self { store, pool: None, observer: None }
    }

    /// Unblocks the files of each directory on a pool of `threads` workers
    /// (0 = one per CPU core).
    pub fn parallel(mut self, threads: usize) -> Result<Self> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("unblock-worker-{i}"))
            .build()?;
        self.pool = Some(pool);
        Ok(self)
    }

    /// Registers a callback invoked for every file outcome and skipped subtree
    /// as soon as it is known.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&WalkEvent<'_>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(callback));
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Unblocks every regular file under `root`.
    ///
    /// Only fails if `root` itself is not a directory.
    pub fn walk(&self, root: &Path) -> Result<WalkResult> {
        if !root.is_dir() {
            return Err(UnblockError::NotADirectory { path: root.to_path_buf() });
        }

        let total_files = count_files(root);
        info!(root = %root.display(), total_files, parallel = self.is_parallel(), "starting walk");

        let acc = self.walk_dir(root, WalkAccumulator::default());
        let result = WalkResult {
            root: root.to_path_buf(),
            total_files,
            processed_files: acc.processed.into_inner(),
            outcomes: acc.outcomes,
            subtree_failures: acc.subtree_failures,
        };

        info!(
            root = %root.display(),
            total = result.total_files,
            processed = result.processed_files,
            skipped_subtrees = result.subtree_failures.len(),
            "walk finished"
        );
        Ok(result)
    }

    /// Runs [`TreeWalker::walk`] on a blocking worker so the caller's task is
    /// not held up for the duration of the walk.
    pub async fn walk_in_background(self: Arc<Self>, root: PathBuf) -> Result<WalkResult> {
        tokio::task::spawn_blocking(move || self.walk(&root)).await?
    }

    fn walk_dir(&self, dir: &Path, mut acc: WalkAccumulator) -> WalkAccumulator {
        let (files, subdirs) = match list_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(error = %err, "skipping subtree");
                let failure = SubtreeFailure { path: dir.to_path_buf(), cause: err.to_string() };
                self.emit(&WalkEvent::SubtreeFailed { path: &failure.path, cause: &failure.cause });
                acc.subtree_failures.push(failure);
                return acc;
            }
        };

        let processed = &acc.processed;
        let visit = |path: PathBuf| {
            let outcome = unblock(self.store.as_ref(), &path);
            if outcome.is_success() {
                processed.fetch_add(1, Ordering::Relaxed);
            }
            self.emit(&WalkEvent::File { path: &path, outcome: &outcome });
            FileOutcome { path, outcome }
        };

        let outcomes: Vec<FileOutcome> = match &self.pool {
            Some(pool) => pool.install(|| files.into_par_iter().map(visit).collect()),
            None => files.into_iter().map(visit).collect(),
        };
        acc.outcomes.extend(outcomes);

        for sub in subdirs {
            acc = self.walk_dir(&sub, acc);
        }
        acc
    }

    fn emit(&self, event: &WalkEvent<'_>) {
        if let Some(cb) = &self.observer {
            cb(event);
        }
    }
}

/// Counts the regular files under `root` without following symlinks.
///
/// Unreadable entries are skipped here; the walk itself reports them.
pub fn count_files(root: &Path) -> usize {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!(error = %e, "count scan skipped entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .count()
}

/// Lists one directory level, split into regular files and subdirectories,
/// each sorted by name. Symlinks and special files are ignored.
fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let enumeration_error =
        |source| UnblockError::SubtreeEnumeration { path: dir.to_path_buf(), source };

    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(enumeration_error)? {
        let entry = entry.map_err(enumeration_error)?;
        let file_type = entry.file_type().map_err(enumeration_error)?;
        if file_type.is_file() {
            files.push(entry.path());
        } else if file_type.is_dir() {
            subdirs.push(entry.path());
        }
    }
    files.sort();
    subdirs.sort();
    Ok((files, subdirs))
}

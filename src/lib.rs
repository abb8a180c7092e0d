//! # unblock
//!
//! Removes the "downloaded from the internet" marker that operating systems
//! attach to files fetched over a network, one file at a time or across a
//! whole directory tree, and installs an "Unblock" context-menu action.
//!
//! ## Key Modules
//!
//! - [`marker`]: The [`MarkerStore`] capability and the inspector/remover pair built on it.
//! - [`unblock`](mod@unblock): Single-file unblocking with a tri-state [`UnblockOutcome`].
//! - [`walk`]: Recursive directory unblocking producing a [`WalkResult`].
//! - [`notify`]: Turns outcomes into notifications for the console or desktop.
//! - [`registrar`]: Installs and removes the context-menu entries.
//!
//! ## Examples
//!
//! ```no_run
//! use std::path::Path;
//! use ::unblock::{marker, config::UnblockConfig, unblock, UnblockOutcome};
//!
//! let store = marker::platform_store(&UnblockConfig::default());
//! let outcome = unblock(store.as_ref(), Path::new("setup.exe"));
//! assert!(matches!(outcome, UnblockOutcome::Unblocked | UnblockOutcome::AlreadyClean));
//! ```

pub mod cli;
pub mod cli_runner;
pub mod config;
pub mod error;
pub use error::{Result, UnblockError};

pub mod logging;
pub mod marker;
pub use marker::MarkerStore;

pub mod notify;
pub mod registrar;

pub mod unblock;
pub use crate::unblock::{unblock, UnblockOutcome};

pub mod walk;
pub use walk::{TreeWalker, WalkResult};

//! CLI runner shared by the `unblock` binary and the integration tests.
//!
//! Resolves the target to a file or a folder, runs the matching engine entry
//! point, and hands every terminal outcome to the configured [`Notifier`].

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::cli::{self, Action};
use crate::config::UnblockConfig;
use crate::marker::{self, MarkerStore};
use crate::notify::{self, messages, Notification, Notifier};
use crate::registrar::{self, ShellRegistrar};
use crate::unblock::{unblock, UnblockOutcome};
use crate::walk::{TreeWalker, WalkEvent};

/// Public entry for running CLI logic.
///
/// Returns `Ok(true)` when the invocation fully succeeded, `Ok(false)` when an
/// outcome was reported as a failure, and `Err` for setup errors (bad config,
/// runtime startup).
pub fn run_cli_app() -> Result<bool, Box<dyn std::error::Error>> {
    let args = cli::run();
    let config = args.apply_to(UnblockConfig::load(args.config_path())?.with_env());
    let notifier = notify::from_kind(config.notifier);

    match args.action() {
        Action::Usage => {
            notifier.notify(&Notification::usage());
            Ok(true)
        }
        Action::Register => {
            let exe = std::env::current_exe()?;
            let registrar: Box<dyn ShellRegistrar> = registrar::platform_registrar()?;
            Ok(report_registration(notifier.as_ref(), registrar.register(&exe), messages::REGISTERED))
        }
        Action::Unregister => {
            let registrar: Box<dyn ShellRegistrar> = registrar::platform_registrar()?;
            Ok(report_registration(notifier.as_ref(), registrar.unregister(), messages::UNREGISTERED))
        }
        Action::Unblock(path) => {
            let store = marker::platform_store(&config);
            if path.is_file() {
                Ok(unblock_file(store.as_ref(), &path, notifier.as_ref(), config.json)?)
            } else if path.is_dir() {
                unblock_dir(store, &path, Arc::from(notifier), &config)
            } else {
                notifier.notify(&Notification::error(format!("{}: {}", messages::NOT_FOUND, path.display())));
                Ok(false)
            }
        }
    }
}

fn report_registration(notifier: &dyn Notifier, result: crate::Result<()>, success: &str) -> bool {
    match result {
        Ok(()) => {
            notifier.notify(&Notification::info("", success));
            true
        }
        Err(e) => {
            notifier.notify(&Notification::error(e.to_string()));
            false
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct SingleReport<'a> {
    path: &'a Path,
    #[serde(flatten)]
    outcome: &'a UnblockOutcome,
}

fn unblock_file(
    store: &dyn MarkerStore,
    path: &Path,
    notifier: &dyn Notifier,
    json: bool,
) -> serde_json::Result<bool> {
    let outcome = unblock(store, path);
    info!(path = %path.display(), ?outcome, "single file");
    notifier.notify(&Notification::for_outcome(path, &outcome));
    if json {
        print_json(&SingleReport { path, outcome: &outcome })?;
    }
    Ok(outcome.is_success())
}

fn unblock_dir(
    store: Arc<dyn MarkerStore>,
    root: &Path,
    notifier: Arc<dyn Notifier>,
    config: &UnblockConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut walker = TreeWalker::new(store);
    if config.parallel {
        walker = walker.parallel(config.jobs)?;
    }

    // Failures are reported as they happen; successes only in the summary.
    let events = Arc::clone(&notifier);
    let walker = Arc::new(walker.on_event(move |event| match event {
        WalkEvent::File { path, outcome } if !outcome.is_success() => {
            events.notify(&Notification::for_outcome(path, outcome));
        }
        WalkEvent::SubtreeFailed { path, cause } => {
            events.notify(&Notification::for_subtree_failure(path, cause));
        }
        WalkEvent::File { .. } => {}
    }));

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let result = runtime.block_on(walker.walk_in_background(root.to_path_buf()))?;

    notifier.notify(&Notification::for_walk(&result));
    if config.json {
        print_json(&result)?;
    }
    Ok(result.all_succeeded())
}

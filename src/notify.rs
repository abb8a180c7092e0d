//! Outcome notifications.
//!
//! The engine only produces outcome values; this module turns them into
//! (title, message, severity) triples and hands them to a [`Notifier`].

use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
#[cfg(not(windows))]
use std::process::Stdio;

use tracing::debug;

use crate::config::NotifierKind;
use crate::unblock::UnblockOutcome;
use crate::walk::WalkResult;

pub const APP_NAME: &str = "unblock";

/// Message catalog.
pub mod messages {
    pub const ERROR: &str = "Error";
    pub const FILE_UNBLOCKED: &str = "File unblocked";
    pub const FILES_UNBLOCKED: &str = "Files unblocked";
    pub const NOTHING_TO_DO: &str = "Nothing to do";
    pub const ALL_FILES_UNBLOCKED: &str = "All files have been successfully unblocked";
    pub const NOT_FOUND: &str = "File or folder not found";
    pub const NOT_BLOCKED: &str = "File is not blocked";
    pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";
    pub const FAILED_TO_UNBLOCK: &str = "Failed to unblock the file";
    pub const FOLDER_NOT_READABLE: &str = "Folder could not be read";
    pub const SOME_FILES_FAILED: &str = "Some files could not be unblocked";
    pub const REGISTERED: &str = "Program registered in the context menu successfully";
    pub const UNREGISTERED: &str = "Program unregistered from the context menu successfully";
    pub const USAGE: &str = "Usage:\n\tunblock <file_path>\n\tunblock register\n\tunblock unregister";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self { title: title.into(), message: message.into(), severity }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Info)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(messages::ERROR, message, Severity::Error)
    }

    /// Notification for a single file's outcome.
    pub fn for_outcome(path: &Path, outcome: &UnblockOutcome) -> Self {
        let shown = path.display();
        match outcome {
            UnblockOutcome::Unblocked => Self::info(messages::FILE_UNBLOCKED, shown.to_string()),
            UnblockOutcome::AlreadyClean => {
                Self::info(messages::NOTHING_TO_DO, format!("{}: {shown}", messages::NOT_BLOCKED))
            }
            UnblockOutcome::NotFound => Self::error(format!("{}: {shown}", messages::NOT_FOUND)),
            UnblockOutcome::PermissionDenied => {
                Self::error(format!("{}: {shown}", messages::INSUFFICIENT_PERMISSIONS))
            }
            UnblockOutcome::Failed(cause) => {
                Self::error(format!("{}: {shown}\n{cause}", messages::FAILED_TO_UNBLOCK))
            }
        }
    }

    /// Notification for a directory that could not be listed.
    pub fn for_subtree_failure(path: &Path, cause: &str) -> Self {
        Self::error(format!("{}: {}\n{cause}", messages::FOLDER_NOT_READABLE, path.display()))
    }

    /// Final notification for a walk. Per-file failures are reported as they
    /// happen, so an unsuccessful walk only gets a short count.
    pub fn for_walk(result: &WalkResult) -> Self {
        if result.all_succeeded() {
            Self::info(messages::FILES_UNBLOCKED, messages::ALL_FILES_UNBLOCKED)
        } else {
            Self::warning(
                messages::SOME_FILES_FAILED,
                format!(
                    "{} of {} files in {} are unblocked",
                    result.processed_files,
                    result.visited_files(),
                    result.root.display()
                ),
            )
        }
    }

    pub fn usage() -> Self {
        Self::warning(APP_NAME, messages::USAGE)
    }
}

/// Receives terminal outcome messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Builds the notifier selected in the configuration.
pub fn from_kind(kind: NotifierKind) -> Box<dyn Notifier> {
    match kind {
        NotifierKind::Console => Box::new(ConsoleNotifier),
        NotifierKind::Desktop => Box::new(DesktopNotifier::default()),
    }
}

/// Prints info to stdout, warnings and errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    fn render(notification: &Notification) -> String {
        let prefix = match notification.severity {
            Severity::Info => "",
            Severity::Warning => "warning: ",
            Severity::Error => "error: ",
        };
        if notification.title.is_empty() || notification.title == messages::ERROR {
            format!("{prefix}{}", notification.message)
        } else {
            format!("{prefix}{}: {}", notification.title, notification.message)
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        let line = Self::render(notification);
        // A closed pipe is not worth failing the unblock over.
        let _ = match notification.severity {
            Severity::Info => writeln!(io::stdout().lock(), "{line}"),
            Severity::Warning | Severity::Error => writeln!(io::stderr().lock(), "{line}"),
        };
    }
}

/// Shows desktop notifications: a toast on Windows, `notify-send` on
/// Linux/BSD, `osascript` on macOS. Anything that cannot be shown goes to the
/// console.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier {
    fallback: ConsoleNotifier,
}

fn display_title(notification: &Notification) -> &str {
    if notification.title.is_empty() {
        APP_NAME
    } else {
        notification.title.as_str()
    }
}

impl DesktopNotifier {
    #[cfg(windows)]
    fn show(notification: &Notification) -> bool {
        let result = notify_rust::Notification::new()
            .appname(APP_NAME)
            .summary(display_title(notification))
            .body(&notification.message)
            .timeout(notify_rust::Timeout::Milliseconds(3000))
            .show();
        match result {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "toast notification failed");
                false
            }
        }
    }

    #[cfg(not(windows))]
    fn show(notification: &Notification) -> bool {
        Self::command(notification).is_some_and(|mut cmd| {
            match cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null()).status() {
                Ok(status) => status.success(),
                Err(e) => {
                    debug!(error = %e, "desktop notification helper unavailable");
                    false
                }
            }
        })
    }

    #[cfg_attr(windows, allow(dead_code))]
    fn command(notification: &Notification) -> Option<Command> {
        let title = display_title(notification);
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(format!(
                "display notification \"{}\" with title \"{}\"",
                applescript_escape(&notification.message),
                applescript_escape(title)
            ));
            Some(cmd)
        } else if cfg!(all(unix, not(target_os = "android"))) {
            let urgency = match notification.severity {
                Severity::Info => "low",
                Severity::Warning => "normal",
                Severity::Error => "critical",
            };
            let mut cmd = Command::new("notify-send");
            cmd.arg(format!("--app-name={APP_NAME}"))
                .arg(format!("--urgency={urgency}"))
                .arg("--expire-time=3000")
                .arg(title)
                .arg(&notification.message);
            Some(cmd)
        } else {
            None
        }
    }
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        if !Self::show(notification) {
            self.fallback.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::FileOutcome;
    use std::path::PathBuf;

    fn walk_result(outcomes: Vec<UnblockOutcome>) -> WalkResult {
        let processed = outcomes.iter().filter(|o| o.is_success()).count();
        WalkResult {
            root: PathBuf::from("Downloads"),
            total_files: outcomes.len(),
            processed_files: processed,
            outcomes: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| FileOutcome { path: PathBuf::from(format!("f{i}")), outcome })
                .collect(),
            subtree_failures: Vec::new(),
        }
    }

    #[test]
    fn test_outcome_severities() {
        let p = Path::new("setup.exe");
        assert_eq!(Notification::for_outcome(p, &UnblockOutcome::Unblocked).severity, Severity::Info);
        assert_eq!(Notification::for_outcome(p, &UnblockOutcome::AlreadyClean).severity, Severity::Info);
        assert_eq!(Notification::for_outcome(p, &UnblockOutcome::NotFound).severity, Severity::Error);
        assert_eq!(Notification::for_outcome(p, &UnblockOutcome::PermissionDenied).severity, Severity::Error);

        let n = Notification::for_outcome(p, &UnblockOutcome::Failed("disk on fire".into()));
        assert_eq!(n.severity, Severity::Error);
        assert!(n.message.starts_with(messages::FAILED_TO_UNBLOCK));
        assert!(n.message.contains("disk on fire"));
    }

    #[test]
    fn test_walk_summary() {
        let ok = walk_result(vec![UnblockOutcome::Unblocked, UnblockOutcome::AlreadyClean]);
        let n = Notification::for_walk(&ok);
        assert_eq!(n.severity, Severity::Info);
        assert_eq!(n.message, messages::ALL_FILES_UNBLOCKED);

        let partial = walk_result(vec![UnblockOutcome::Unblocked, UnblockOutcome::PermissionDenied]);
        let n = Notification::for_walk(&partial);
        assert_eq!(n.severity, Severity::Warning);
        assert!(n.message.starts_with("1 of 2 files"));
    }

    #[test]
    fn test_console_render() {
        assert_eq!(
            ConsoleNotifier::render(&Notification::info(messages::FILE_UNBLOCKED, "a.txt")),
            "File unblocked: a.txt"
        );
        assert_eq!(ConsoleNotifier::render(&Notification::error("boom")), "error: boom");
    }

    #[test]
    fn test_applescript_escape() {
        assert_eq!(applescript_escape(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
    }
}

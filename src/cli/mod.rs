use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{NotifierKind, UnblockConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File or folder to unblock, or `register` / `unregister` to manage the context-menu entries.
    pub target: Option<PathBuf>,

    /// Unblock the files of each folder in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Number of parallel threads to use. [0 = auto-detect based on CPU cores]
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Where to show outcome notifications.
    #[arg(long, value_enum)]
    pub notifier: Option<NotifierKind>,

    /// Also print the outcome report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Read configuration from this file instead of the default location.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No target given: show usage and touch nothing.
    Usage,
    Register,
    Unregister,
    Unblock(PathBuf),
}

impl Args {
    /// Interprets the positional target. `register` and `unregister` are
    /// matched case-insensitively; anything else is a path.
    pub fn action(&self) -> Action {
        let Some(target) = &self.target else {
            return Action::Usage;
        };
        match target.to_str().map(str::to_ascii_lowercase).as_deref() {
            Some("register") => Action::Register,
            Some("unregister") => Action::Unregister,
            _ => Action::Unblock(target.clone()),
        }
    }

    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply_to(&self, mut config: UnblockConfig) -> UnblockConfig {
        if self.parallel {
            config.parallel = true;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(notifier) = self.notifier {
            config.notifier = notifier;
        }
        if self.json {
            config.json = true;
        }
        config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("unblock").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_arguments_is_usage() {
        assert_eq!(parse(&[]).action(), Action::Usage);
    }

    #[test]
    fn test_register_keywords_ignore_case() {
        assert_eq!(parse(&["register"]).action(), Action::Register);
        assert_eq!(parse(&["REGISTER"]).action(), Action::Register);
        assert_eq!(parse(&["Unregister"]).action(), Action::Unregister);
    }

    #[test]
    fn test_path_target() {
        assert_eq!(
            parse(&["C:/Users/me/Downloads"]).action(),
            Action::Unblock(PathBuf::from("C:/Users/me/Downloads"))
        );
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&["--parallel", "--jobs", "2", "--notifier", "desktop", "--json", "x"]);
        let config = args.apply_to(UnblockConfig::default());
        assert!(config.parallel);
        assert_eq!(config.jobs, 2);
        assert_eq!(config.notifier, NotifierKind::Desktop);
        assert!(config.json);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let base = UnblockConfig { parallel: true, jobs: 6, ..UnblockConfig::default() };
        let config = parse(&["x"]).apply_to(base.clone());
        assert_eq!(config, base);
    }

    #[test]
    fn test_context_menu_arguments_select_desktop_notifier() {
        let mut argv: Vec<&str> = crate::registrar::MENU_ARGS.split_whitespace().collect();
        argv.push(r"C:\Users\me\Downloads\setup.exe");
        let args = parse(&argv);
        assert_eq!(args.action(), Action::Unblock(PathBuf::from(r"C:\Users\me\Downloads\setup.exe")));
        assert_eq!(args.apply_to(UnblockConfig::default()).notifier, NotifierKind::Desktop);
    }
}

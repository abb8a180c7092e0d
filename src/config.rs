//! Configuration loaded from `<config dir>/unblock/config.toml`.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! `UNBLOCK_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, UnblockError};

/// Where outcome notifications are shown.
#[derive(ValueEnum, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Print to the terminal.
    #[default]
    Console,
    /// Show a desktop notification, falling back to the terminal.
    Desktop,
}

impl NotifierKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => Some(NotifierKind::Console),
            "desktop" => Some(NotifierKind::Desktop),
            _ => None,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct UnblockConfig {
    /// Unblock the files of each directory in parallel.
    pub parallel: bool,
    /// Worker threads for parallel mode. 0 = one per CPU core.
    pub jobs: usize,
    pub notifier: NotifierKind,
    /// Extended-attribute names that make up the marker (Unix only).
    /// `None` uses the platform default.
    pub attributes: Option<Vec<String>>,
    /// Also print the outcome report as JSON on stdout.
    pub json: bool,
}

impl UnblockConfig {
    /// Loads the configuration.
    ///
    /// An explicit path must exist and parse. The default location is optional:
    /// a missing file yields defaults and a malformed one is logged and ignored.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let Some(path) = Self::default_path() else {
                    debug!("no config directory on this platform, using defaults");
                    return Ok(Self::default());
                };
                if !path.exists() {
                    debug!(path = %path.display(), "config file not found, using defaults");
                    return Ok(Self::default());
                }
                match Self::from_file(&path) {
                    Ok(config) => Ok(config),
                    Err(e) => {
                        warn!(error = %e, "ignoring config file");
                        Ok(Self::default())
                    }
                }
            }
        }
    }

    /// `<config dir>/unblock/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("unblock").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| UnblockError::ConfigIo { path: path.to_path_buf(), source })?;
        let config = Self::from_toml(&contents)
            .map_err(|source| UnblockError::ConfigParse { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), "loaded config from file");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Applies `UNBLOCK_PARALLEL`, `UNBLOCK_JOBS` and `UNBLOCK_NOTIFIER` from the
    /// process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides read through `lookup`. Unparsable values
    /// are logged and ignored.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("UNBLOCK_PARALLEL") {
            match parse_bool(&value) {
                Some(flag) => self.parallel = flag,
                None => warn!(value = %value, "ignoring invalid UNBLOCK_PARALLEL"),
            }
        }
        if let Some(value) = lookup("UNBLOCK_JOBS") {
            match value.trim().parse() {
                Ok(jobs) => self.jobs = jobs,
                Err(_) => warn!(value = %value, "ignoring invalid UNBLOCK_JOBS"),
            }
        }
        if let Some(value) = lookup("UNBLOCK_NOTIFIER") {
            match NotifierKind::parse(&value) {
                Some(kind) => self.notifier = kind,
                None => warn!(value = %value, "ignoring invalid UNBLOCK_NOTIFIER"),
            }
        }
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

//! Context-menu registration.
//!
//! Installs an "Unblock" action for files and for folders that runs this
//! binary with the clicked item's path as its only argument. On Windows the
//! entries are registry keys under `HKCU\Software\Classes` written with
//! `reg.exe`; elsewhere they are desktop-entry service menus.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{Result, UnblockError};

/// What an entry applies to when right-clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTarget {
    File,
    Directory,
}

impl MenuTarget {
    pub const ALL: [MenuTarget; 2] = [MenuTarget::File, MenuTarget::Directory];

    pub fn label(self) -> &'static str {
        match self {
            MenuTarget::File => "Unblock file",
            MenuTarget::Directory => "Unblock folder",
        }
    }
}

/// Arguments placed before the clicked path. A context-menu launch has no
/// terminal to read, so outcomes go to desktop notifications.
pub const MENU_ARGS: &str = "--notifier desktop";

/// One context-menu entry, independent of how it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenuEntry {
    pub target: MenuTarget,
    pub label: String,
    /// Command line run on click; contains the platform's path placeholder.
    pub command: String,
    pub icon: String,
}

impl ContextMenuEntry {
    /// Builds the entry for `target`. `placeholder` is the shell's token for
    /// the clicked path, quoted as that shell expects (`"%V"` in Explorer,
    /// a bare `%f` in desktop entries).
    pub fn new(target: MenuTarget, exe: &Path, placeholder: &str) -> Self {
        let exe = exe.display();
        Self {
            target,
            label: target.label().to_string(),
            command: format!("\"{exe}\" {MENU_ARGS} {placeholder}"),
            icon: format!("\"{exe}\",0"),
        }
    }
}

/// Installs and removes the context-menu entries.
pub trait ShellRegistrar {
    fn register(&self, exe: &Path) -> Result<()>;
    fn unregister(&self) -> Result<()>;
}

/// The registrar for the running platform.
pub fn platform_registrar() -> Result<Box<dyn ShellRegistrar>> {
    if cfg!(windows) {
        Ok(Box::new(RegistryRegistrar::default()))
    } else {
        Ok(Box::new(ServiceMenuRegistrar::user_default()?))
    }
}

// --- Windows registry -------------------------------------------------------

/// Writes `HKCU\Software\Classes\{*,Directory}\shell\UnblockFile` through `reg.exe`.
#[derive(Debug, Clone)]
pub struct RegistryRegistrar {
    key_name: String,
}

impl Default for RegistryRegistrar {
    fn default() -> Self {
        Self { key_name: "UnblockFile".to_string() }
    }
}

impl RegistryRegistrar {
    pub fn key(&self, target: MenuTarget) -> String {
        let class = match target {
            MenuTarget::File => "*",
            MenuTarget::Directory => "Directory",
        };
        format!(r"HKCU\Software\Classes\{class}\shell\{}", self.key_name)
    }

    /// `reg.exe` argument lists that install `entry`.
    pub fn add_commands(&self, entry: &ContextMenuEntry) -> Vec<Vec<String>> {
        let key = self.key(entry.target);
        let command_key = format!(r"{key}\command");
        vec![
            args(&["add", &key, "/ve", "/d", &entry.label, "/f"]),
            args(&["add", &key, "/v", "Icon", "/t", "REG_SZ", "/d", &entry.icon, "/f"]),
            args(&["add", &command_key, "/ve", "/d", &entry.command, "/f"]),
        ]
    }

    fn key_exists(&self, key: &str) -> bool {
        Command::new("reg")
            .args(["query", key])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn run_reg(operation: &'static str, reg_args: &[String]) -> Result<()> {
    debug!(args = ?reg_args, "running reg.exe");
    let output = Command::new("reg")
        .args(reg_args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| UnblockError::Registrar { operation, message: format!("could not run reg.exe: {e}") })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(UnblockError::Registrar {
            operation,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl ShellRegistrar for RegistryRegistrar {
    fn register(&self, exe: &Path) -> Result<()> {
        for target in MenuTarget::ALL {
            let entry = ContextMenuEntry::new(target, exe, "\"%V\"");
            for reg_args in self.add_commands(&entry) {
                run_reg("registration", &reg_args)?;
            }
            info!(key = %self.key(target), "registered context-menu entry");
        }
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        for target in MenuTarget::ALL {
            let key = self.key(target);
            if !self.key_exists(&key) {
                debug!(key = %key, "context-menu entry not present");
                continue;
            }
            run_reg("unregistration", &args(&["delete", &key, "/f"]))?;
            info!(key = %key, "removed context-menu entry");
        }
        Ok(())
    }
}

// --- Desktop-entry service menus ---------------------------------------------

/// Writes one service-menu desktop entry per target into a directory
/// (by default `<data dir>/kio/servicemenus`).
#[derive(Debug, Clone)]
pub struct ServiceMenuRegistrar {
    dir: PathBuf,
}

impl ServiceMenuRegistrar {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn user_default() -> Result<Self> {
        let data = dirs::data_dir().ok_or(UnblockError::Registrar {
            operation: "registration",
            message: "no user data directory on this platform".to_string(),
        })?;
        Ok(Self::new(data.join("kio").join("servicemenus")))
    }

    pub fn entry_path(&self, target: MenuTarget) -> PathBuf {
        let file = match target {
            MenuTarget::File => "unblock-file.desktop",
            MenuTarget::Directory => "unblock-folder.desktop",
        };
        self.dir.join(file)
    }

    /// Desktop-entry text for `entry`.
    pub fn render(entry: &ContextMenuEntry) -> String {
        let mime = match entry.target {
            MenuTarget::File => "all/allfiles;",
            MenuTarget::Directory => "inode/directory;",
        };
        format!(
            "[Desktop Entry]\n\
             Type=Service\n\
             X-KDE-ServiceTypes=KonqPopupMenu/Plugin\n\
             MimeType={mime}\n\
             Actions=unblock;\n\
             X-KDE-Priority=TopLevel\n\
             \n\
             [Desktop Action unblock]\n\
             Name={label}\n\
             Icon=security-medium\n\
             Exec={command}\n",
            label = entry.label,
            command = entry.command,
        )
    }

    fn io_error(path: &Path) -> impl FnOnce(io::Error) -> UnblockError + '_ {
        move |source| UnblockError::Io { path: path.to_path_buf(), source }
    }
}

impl ShellRegistrar for ServiceMenuRegistrar {
    fn register(&self, exe: &Path) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(Self::io_error(&self.dir))?;
        for target in MenuTarget::ALL {
            let entry = ContextMenuEntry::new(target, exe, "%f");
            let path = self.entry_path(target);
            fs::write(&path, Self::render(&entry)).map_err(Self::io_error(&path))?;
            // Service menus are only loaded when executable.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                    .map_err(Self::io_error(&path))?;
            }
            info!(path = %path.display(), "registered context-menu entry");
        }
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        for target in MenuTarget::ALL {
            let path = self.entry_path(target);
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed context-menu entry"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "context-menu entry not present");
                }
                Err(source) => return Err(UnblockError::Io { path, source }),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_entry_command_and_icon() {
        let entry = ContextMenuEntry::new(MenuTarget::Directory, Path::new(r"C:\Tools\unblock.exe"), r#""%V""#);
        assert_eq!(entry.label, "Unblock folder");
        assert_eq!(entry.command, r#""C:\Tools\unblock.exe" --notifier desktop "%V""#);
        assert_eq!(entry.icon, r#""C:\Tools\unblock.exe",0"#);
    }

    #[test]
    fn test_registry_keys() {
        let reg = RegistryRegistrar::default();
        assert_eq!(reg.key(MenuTarget::File), r"HKCU\Software\Classes\*\shell\UnblockFile");
        assert_eq!(reg.key(MenuTarget::Directory), r"HKCU\Software\Classes\Directory\shell\UnblockFile");
    }

    #[test]
    fn test_registry_add_commands() {
        let reg = RegistryRegistrar::default();
        let entry = ContextMenuEntry::new(MenuTarget::File, Path::new(r"C:\unblock.exe"), r#""%V""#);
        let cmds = reg.add_commands(&entry);
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0], args(&["add", r"HKCU\Software\Classes\*\shell\UnblockFile", "/ve", "/d", "Unblock file", "/f"]));
        assert_eq!(cmds[1][3], "Icon");
        assert_eq!(cmds[2][1], r"HKCU\Software\Classes\*\shell\UnblockFile\command");
        assert_eq!(cmds[2][4], r#""C:\unblock.exe" --notifier desktop "%V""#);
    }

    #[test]
    fn test_service_menu_register_and_unregister() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let registrar = ServiceMenuRegistrar::new(dir.path().join("servicemenus"));

        registrar.register(Path::new("/usr/local/bin/unblock"))?;
        let file_entry = fs::read_to_string(registrar.entry_path(MenuTarget::File))?;
        assert!(file_entry.contains("MimeType=all/allfiles;"));
        assert!(file_entry.contains(r#"Exec="/usr/local/bin/unblock" --notifier desktop %f"#));
        let dir_entry = fs::read_to_string(registrar.entry_path(MenuTarget::Directory))?;
        assert!(dir_entry.contains("Name=Unblock folder"));

        registrar.unregister()?;
        assert!(!registrar.entry_path(MenuTarget::File).exists());
        assert!(!registrar.entry_path(MenuTarget::Directory).exists());

        // Removing twice is fine.
        registrar.unregister()?;
        Ok(())
    }
}

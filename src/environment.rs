//! Machine-scope PATH handling.
//!
//! The installer never touches the OS directly; it goes through
//! [`SystemEnvironment`], which has one real implementation per platform:
//!
//! - Windows: `HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment`
//!   followed by a `WM_SETTINGCHANGE` broadcast.
//! - Unix: a profile script (e.g. `/etc/profile.d/kryer.sh`) that appends the
//!   machine-wide additions to `PATH` for every login shell.

use std::io;
use std::path::Path;

#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

pub trait SystemEnvironment {
    /// Current machine-scope PATH value.
    fn read_path_var(&self) -> io::Result<String>;

    /// Persist `value` as the machine-scope PATH.
    fn write_path_var(&self, value: &str) -> io::Result<()>;

    /// Tell running processes the environment changed.
    fn broadcast_change(&self) -> io::Result<()>;

    /// Whether the current user may create and delete files in `dir`.
    fn check_writable(&self, dir: &Path) -> bool;
}

impl<T: SystemEnvironment + ?Sized> SystemEnvironment for &T {
    fn read_path_var(&self) -> io::Result<String> {
        (**self).read_path_var()
    }

    fn write_path_var(&self, value: &str) -> io::Result<()> {
        (**self).write_path_var(value)
    }

    fn broadcast_change(&self) -> io::Result<()> {
        (**self).broadcast_change()
    }

    fn check_writable(&self, dir: &Path) -> bool {
        (**self).check_writable(dir)
    }
}

/// Outcome of adding the install directory to PATH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathUpdate {
    Added,
    AlreadyPresent,
}

/// Append `dir` to `path_var` unless it already appears in it.
///
/// Presence is a plain substring test, so any entry containing `dir` counts.
pub fn with_path_entry(path_var: &str, dir: &str, separator: char) -> Option<String> {
    if path_var.contains(dir) {
        return None;
    }
    if path_var.is_empty() {
        Some(dir.to_string())
    } else if path_var.ends_with(separator) {
        Some(format!("{}{}", path_var, dir))
    } else {
        Some(format!("{}{}{}", path_var, separator, dir))
    }
}

/// Drop every entry exactly equal to `dir` from `path_var`.
pub fn without_path_entry(path_var: &str, dir: &str, separator: char) -> Option<String> {
    let entries: Vec<&str> = path_var.split(separator).collect();
    let kept: Vec<&str> = entries.iter().copied().filter(|e| *e != dir).collect();
    if kept.len() == entries.len() {
        return None;
    }
    Some(kept.join(&separator.to_string()))
}

pub fn ensure_on_path<E: SystemEnvironment + ?Sized>(env: &E, dir: &Path) -> io::Result<PathUpdate> {
    let current = env.read_path_var()?;
    let dir = dir.to_string_lossy();

    match with_path_entry(&current, &dir, PATH_SEPARATOR) {
        Some(updated) => {
            env.write_path_var(&updated)?;
            env.broadcast_change()?;
            Ok(PathUpdate::Added)
        }
        None => Ok(PathUpdate::AlreadyPresent),
    }
}

/// Remove `dir` from the machine PATH. Returns whether anything changed.
pub fn remove_from_path<E: SystemEnvironment + ?Sized>(env: &E, dir: &Path) -> io::Result<bool> {
    let current = env.read_path_var()?;
    let dir = dir.to_string_lossy();

    match without_path_entry(&current, &dir, PATH_SEPARATOR) {
        Some(updated) => {
            env.write_path_var(&updated)?;
            env.broadcast_change()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Probe `dir` by creating and dropping an anonymous temporary file in it.
pub fn probe_writable(dir: &Path) -> bool {
    match tempfile::tempfile_in(dir) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("{} is not writable: {}", dir.display(), e);
            false
        }
    }
}

#[cfg(windows)]
pub use windows_env::MachineEnvironment;

#[cfg(windows)]
mod windows_env {
    use super::{probe_writable, SystemEnvironment};
    use std::io;
    use std::path::Path;
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WRITE, REG_EXPAND_SZ};
    use winreg::types::ToRegValue;
    use winreg::RegKey;

    const ENVIRONMENT_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";

    #[derive(Debug, Default)]
    pub struct MachineEnvironment;

    impl MachineEnvironment {
        pub fn new() -> Self {
            Self
        }
    }

    impl SystemEnvironment for MachineEnvironment {
        fn read_path_var(&self) -> io::Result<String> {
            let env = RegKey::predef(HKEY_LOCAL_MACHINE)
                .open_subkey_with_flags(ENVIRONMENT_KEY, KEY_READ)?;
            match env.get_value::<String, _>("Path") {
                Ok(value) => Ok(value),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
                Err(e) => Err(e),
            }
        }

        fn write_path_var(&self, value: &str) -> io::Result<()> {
            let env = RegKey::predef(HKEY_LOCAL_MACHINE)
                .open_subkey_with_flags(ENVIRONMENT_KEY, KEY_READ | KEY_WRITE)?;
            // Path holds %SystemRoot% style references and must stay expandable
            let mut reg_value = value.to_string().to_reg_value();
            reg_value.vtype = REG_EXPAND_SZ;
            env.set_raw_value("Path", &reg_value)
        }

        fn broadcast_change(&self) -> io::Result<()> {
            use windows::Win32::Foundation::{LPARAM, WPARAM};
            use windows::Win32::UI::WindowsAndMessaging::{
                SendMessageTimeoutW, HWND_BROADCAST, SMTO_ABORTIFHUNG, WM_SETTINGCHANGE,
            };

            let area: Vec<u16> = "Environment".encode_utf16().chain(Some(0)).collect();
            let result = unsafe {
                SendMessageTimeoutW(
                    HWND_BROADCAST,
                    WM_SETTINGCHANGE,
                    WPARAM(0),
                    LPARAM(area.as_ptr() as isize),
                    SMTO_ABORTIFHUNG,
                    5000,
                    None,
                )
            };
            if result.0 == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        fn check_writable(&self, dir: &Path) -> bool {
            probe_writable(dir)
        }
    }
}

#[cfg(not(windows))]
pub use unix_env::MachineEnvironment;

#[cfg(not(windows))]
mod unix_env {
    use super::{probe_writable, SystemEnvironment, PATH_SEPARATOR};
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    const PROFILE_HEADER: &str = "# Added by kryer-installer";
    const EXPORT_PREFIX: &str = "export PATH=\"$PATH:";

    /// Machine PATH backed by a login-shell profile script.
    #[derive(Debug, Clone)]
    pub struct MachineEnvironment {
        profile: PathBuf,
    }

    impl MachineEnvironment {
        pub fn new(profile: impl Into<PathBuf>) -> Self {
            Self {
                profile: profile.into(),
            }
        }

        /// Directories the profile script currently appends to PATH.
        fn profile_entries(&self) -> io::Result<Vec<String>> {
            let content = match fs::read_to_string(&self.profile) {
                Ok(content) => content,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };

            Ok(content
                .lines()
                .filter_map(|line| line.trim().strip_prefix(EXPORT_PREFIX))
                .filter_map(|rest| rest.strip_suffix('"'))
                .flat_map(|dirs| dirs.split(PATH_SEPARATOR))
                .filter(|dir| !dir.is_empty())
                .map(|dir| dir.to_string())
                .collect())
        }
    }

    fn process_path() -> String {
        std::env::var("PATH").unwrap_or_default()
    }

    impl SystemEnvironment for MachineEnvironment {
        fn read_path_var(&self) -> io::Result<String> {
            let mut entries: Vec<String> = process_path()
                .split(PATH_SEPARATOR)
                .filter(|e| !e.is_empty())
                .map(|e| e.to_string())
                .collect();
            for dir in self.profile_entries()? {
                if !entries.contains(&dir) {
                    entries.push(dir);
                }
            }
            Ok(entries.join(&PATH_SEPARATOR.to_string()))
        }

        fn write_path_var(&self, value: &str) -> io::Result<()> {
            let base = process_path();
            let base: Vec<&str> = base.split(PATH_SEPARATOR).collect();
            // entries the script already owns stay, even when this shell inherited them
            let owned = self.profile_entries()?;
            let mut additions: Vec<&str> = Vec::new();
            for entry in value.split(PATH_SEPARATOR) {
                if entry.is_empty() || additions.contains(&entry) {
                    continue;
                }
                if owned.iter().any(|dir| dir == entry) || !base.contains(&entry) {
                    additions.push(entry);
                }
            }

            if additions.is_empty() {
                if self.profile.exists() {
                    tracing::debug!("Removing {}", self.profile.display());
                    fs::remove_file(&self.profile)?;
                }
                return Ok(());
            }

            if let Some(parent) = self.profile.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = format!(
                "{}\n{}{}\"\n",
                PROFILE_HEADER,
                EXPORT_PREFIX,
                additions.join(&PATH_SEPARATOR.to_string())
            );
            tracing::debug!("Writing {}", self.profile.display());
            fs::write(&self.profile, content)
        }

        fn broadcast_change(&self) -> io::Result<()> {
            tracing::debug!(
                "New login shells pick up {} automatically",
                self.profile.display()
            );
            Ok(())
        }

        fn check_writable(&self, dir: &Path) -> bool {
            probe_writable(dir)
        }
    }

}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory environment double.
    #[derive(Debug, Default)]
    pub(crate) struct FakeEnvironment {
        pub path: RefCell<String>,
        pub writable: Cell<bool>,
        pub writes: Cell<usize>,
        pub broadcasts: Cell<usize>,
    }

    impl FakeEnvironment {
        pub(crate) fn new(path: &str) -> Self {
            Self {
                path: RefCell::new(path.to_string()),
                writable: Cell::new(true),
                ..Default::default()
            }
        }
    }

    impl SystemEnvironment for FakeEnvironment {
        fn read_path_var(&self) -> io::Result<String> {
            Ok(self.path.borrow().clone())
        }

        fn write_path_var(&self, value: &str) -> io::Result<()> {
            *self.path.borrow_mut() = value.to_string();
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }

        fn broadcast_change(&self) -> io::Result<()> {
            self.broadcasts.set(self.broadcasts.get() + 1);
            Ok(())
        }

        fn check_writable(&self, _dir: &Path) -> bool {
            self.writable.get()
        }
    }

    #[test]
    fn test_with_path_entry() {
        assert_eq!(
            with_path_entry("/usr/bin:/bin", "/opt/kryer", ':').as_deref(),
            Some("/usr/bin:/bin:/opt/kryer")
        );
        assert_eq!(
            with_path_entry(r"C:\Windows;", r"C:\Program Files\Kryer", ';').as_deref(),
            Some(r"C:\Windows;C:\Program Files\Kryer")
        );
        assert_eq!(with_path_entry("", "/opt/kryer", ':').as_deref(), Some("/opt/kryer"));
        assert_eq!(with_path_entry("/usr/bin:/opt/kryer", "/opt/kryer", ':'), None);
    }

    #[test]
    fn test_without_path_entry() {
        assert_eq!(
            without_path_entry("/usr/bin:/opt/kryer:/bin", "/opt/kryer", ':').as_deref(),
            Some("/usr/bin:/bin")
        );
        assert_eq!(without_path_entry("/usr/bin:/bin", "/opt/kryer", ':'), None);
    }

    #[test]
    fn test_ensure_on_path_does_not_duplicate() {
        let env = FakeEnvironment::new("/usr/bin");
        let dir = Path::new("/opt/kryer");

        assert_eq!(ensure_on_path(&env, dir).unwrap(), PathUpdate::Added);
        assert_eq!(ensure_on_path(&env, dir).unwrap(), PathUpdate::AlreadyPresent);

        let expected = format!("/usr/bin{}/opt/kryer", PATH_SEPARATOR);
        assert_eq!(*env.path.borrow(), expected);
        assert_eq!(env.writes.get(), 1);
        assert_eq!(env.broadcasts.get(), 1);
    }

    #[test]
    fn test_remove_from_path() {
        let env = FakeEnvironment::new(&format!("/usr/bin{}/opt/kryer", PATH_SEPARATOR));

        assert!(remove_from_path(&env, Path::new("/opt/kryer")).unwrap());
        assert_eq!(*env.path.borrow(), "/usr/bin");
        assert!(!remove_from_path(&env, Path::new("/opt/kryer")).unwrap());
        assert_eq!(env.broadcasts.get(), 1);
    }

    #[test]
    fn test_probe_writable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(probe_writable(dir.path()));
        assert!(!probe_writable(&dir.path().join("missing")));
    }
}

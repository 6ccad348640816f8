use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const TMP_DIR_NAME: &str = "tmp";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallerSettings {
    #[serde(default = "default_product_name")]
    pub product_name: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,
    #[serde(default = "default_exe_name")]
    pub exe_name: String,
    #[serde(default = "default_platform_marker", alias = "platform")]
    pub platform_marker: String,
    #[serde(default = "default_archive_ext")]
    pub archive_ext: String,
    #[serde(default = "default_checksum_suffix")]
    pub checksum_suffix: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Profile script holding the machine-wide PATH additions on Unix.
    #[serde(default = "default_path_profile")]
    pub path_profile: PathBuf,
}

fn default_product_name() -> String {
    "Kryer".to_string()
}
fn default_repo() -> String {
    "cfschilham/kryer".to_string()
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_install_root() -> PathBuf {
    if cfg!(windows) {
        std::env::var_os("ProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"))
            .join("Kryer")
    } else {
        PathBuf::from("/opt/kryer")
    }
}
fn default_exe_name() -> String {
    if cfg!(windows) {
        "kryer.exe".to_string()
    } else {
        "kryer".to_string()
    }
}
fn default_platform_marker() -> String {
    crate::platform::get_system_info().os
}
fn default_archive_ext() -> String {
    ".zip".to_string()
}
fn default_checksum_suffix() -> String {
    ".sha256".to_string()
}
fn default_user_agent() -> String {
    format!("kryer-installer/{}", env!("CARGO_PKG_VERSION"))
}
fn default_path_profile() -> PathBuf {
    PathBuf::from("/etc/profile.d/kryer.sh")
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            repo: default_repo(),
            api_url: default_api_url(),
            install_root: default_install_root(),
            exe_name: default_exe_name(),
            platform_marker: default_platform_marker(),
            archive_ext: default_archive_ext(),
            checksum_suffix: default_checksum_suffix(),
            user_agent: default_user_agent(),
            path_profile: default_path_profile(),
        }
    }
}

impl InstallerSettings {
    pub fn executable_path(&self) -> PathBuf {
        self.install_root.join(&self.exe_name)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.install_root.join(TMP_DIR_NAME)
    }

    fn exe_stem(&self) -> &str {
        self.exe_name.strip_suffix(".exe").unwrap_or(&self.exe_name)
    }

    /// Name of the directory the archive is unpacked into, inside `tmp_dir`.
    pub fn extract_dir(&self) -> PathBuf {
        self.tmp_dir().join(self.exe_stem())
    }

    /// Local copy of the release archive. Asset names from the API never
    /// become file names.
    pub fn archive_path(&self) -> PathBuf {
        self.tmp_dir()
            .join(format!("{}{}", self.exe_stem(), self.archive_ext))
    }

    pub fn checksum_path(&self) -> PathBuf {
        self.tmp_dir()
            .join(format!("{}{}", self.exe_stem(), self.checksum_suffix))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub assets_url: String,
    #[serde(default)]
    pub tag_name: Option<String>,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// The install archive and its companion checksum file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAssets {
    pub archive: Asset,
    pub checksum: Asset,
    /// Archive name without the archive extension; also the name of the
    /// top-level directory inside the archive.
    pub base_name: String,
}

//! Installation pipeline
//!
//! This module provides functionality for:
//! - Installing or reinstalling the latest release into the install root
//! - Uninstalling a previous installation
//! - Removing the temporary working directory

pub mod github;

use crate::checksum::verify_archive;
use crate::cleanup::remove_working_dir;
use crate::download::{download_file, extract_zip, install_executable};
use crate::environment::{ensure_on_path, remove_from_path, PathUpdate, SystemEnvironment};
use crate::error::InstallError;
use crate::platform::find_install_assets;
use crate::types::{InstallerSettings, Release};
use github::{build_client, build_gh_release_url, get_gh_release_info};
use reqwest::Client;
use std::fs;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        executable: PathBuf,
        path_update: PathUpdate,
    },
    /// A previous installation exists and the user chose to keep it.
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed { path_updated: bool },
    NotInstalled,
}

pub struct Installer<E, R> {
    settings: InstallerSettings,
    env: E,
    input: R,
    client: Client,
    assume_yes: bool,
}

impl<E: SystemEnvironment, R: BufRead> Installer<E, R> {
    pub fn new(settings: InstallerSettings, env: E, input: R) -> Result<Self, InstallError> {
        let client = build_client(&settings.user_agent)?;
        Ok(Self {
            settings,
            env,
            input,
            client,
            assume_yes: false,
        })
    }

    /// Skip the reinstall prompt and treat it as accepted.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    pub fn settings(&self) -> &InstallerSettings {
        &self.settings
    }

    /// Run the full install pipeline. The temporary working directory is
    /// removed before returning, whatever the outcome, including Ctrl-C
    /// while the release is being downloaded or unpacked.
    pub async fn install(&mut self, tag: Option<&str>) -> Result<InstallOutcome, InstallError> {
        self.install_until(tag, ctrl_c()).await
    }

    /// [`install`](Self::install), abandoning the download and unpack steps
    /// as soon as `interrupt` completes.
    pub async fn install_until<F>(
        &mut self,
        tag: Option<&str>,
        interrupt: F,
    ) -> Result<InstallOutcome, InstallError>
    where
        F: Future<Output = ()>,
    {
        let result = match self.prepare(tag).await {
            Ok(Some(release)) => tokio::select! {
                biased;
                _ = interrupt => {
                    println!();
                    Err(InstallError::Interrupted)
                }
                result = self.deploy(&release) => result,
            },
            Ok(None) => Ok(InstallOutcome::Declined),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::debug!("Installation failed: {}", e);
        }
        self.cleanup(true);
        result
    }

    /// Fetch the release and clear the way for it. `None` means the user
    /// kept the existing installation.
    async fn prepare(&mut self, tag: Option<&str>) -> Result<Option<Release>, InstallError> {
        let settings = &self.settings;
        let url = build_gh_release_url(&settings.api_url, &settings.repo, tag);
        println!("Getting latest release information from {}...", url);
        let release = get_gh_release_info(&self.client, &url).await?;

        let install_root = settings.install_root.clone();
        fs::create_dir_all(&install_root).map_err(InstallError::io_at(&install_root))?;

        let executable = settings.executable_path();
        if executable.is_file() {
            if !self.confirm_reinstall()? {
                tracing::info!("Keeping existing installation at {}", executable.display());
                return Ok(None);
            }
            self.remove_executable(&executable)?;
        }

        Ok(Some(release))
    }

    async fn deploy(&self, release: &Release) -> Result<InstallOutcome, InstallError> {
        let settings = &self.settings;
        let install_root = &settings.install_root;
        let tmp_dir = settings.tmp_dir();
        // leftovers of a killed run
        remove_working_dir(&tmp_dir).map_err(InstallError::io_at(&tmp_dir))?;
        fs::create_dir_all(&tmp_dir).map_err(InstallError::io_at(&tmp_dir))?;

        println!("Getting asset list from {}...", release.assets_url);
        let selected = find_install_assets(
            &release.assets,
            &settings.platform_marker,
            &settings.archive_ext,
            &settings.checksum_suffix,
        )?;

        let archive_path = settings.archive_path();
        download_file(&self.client, &selected.archive.browser_download_url, &archive_path).await?;

        println!(
            "Getting SHA256 checksum from {}...",
            selected.checksum.browser_download_url
        );
        let checksum_path = settings.checksum_path();
        download_file(&self.client, &selected.checksum.browser_download_url, &checksum_path).await?;

        verify_archive(&archive_path, &checksum_path)?;

        println!("Extracting {}...", selected.archive.name);
        let extract_dir = settings.extract_dir();
        extract_zip(&archive_path, &extract_dir)?;

        println!("Creating files in {}...", install_root.display());
        let installed = install_executable(
            &extract_dir,
            &selected.base_name,
            &settings.exe_name,
            &settings.executable_path(),
        )?;
        println!("Created {}...", installed.display());

        let path_update = ensure_on_path(&self.env, install_root)
            .map_err(InstallError::io_at(install_root))?;
        match path_update {
            PathUpdate::Added => println!("Added {} to PATH...", install_root.display()),
            PathUpdate::AlreadyPresent => {
                println!("{} already added to PATH...", install_root.display())
            }
        }

        Ok(InstallOutcome::Installed {
            executable: installed,
            path_update,
        })
    }

    /// Ask whether to replace the existing installation. Only an explicit
    /// "n" declines; empty input and end of input accept.
    fn confirm_reinstall(&mut self) -> Result<bool, InstallError> {
        if self.assume_yes {
            return Ok(true);
        }

        print!(
            "{} is already installed, reinstall/update [Y/n]: ",
            self.settings.product_name
        );
        io::stdout().flush().ok();

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .map_err(|source| InstallError::Io {
                path: PathBuf::from("<stdin>"),
                source,
            })?;

        Ok(!answer.trim().eq_ignore_ascii_case("n"))
    }

    fn remove_executable(&self, executable: &Path) -> Result<(), InstallError> {
        let install_root = &self.settings.install_root;
        println!("Removing {}...", executable.display());
        if !self.env.check_writable(install_root) {
            return Err(InstallError::PermissionDenied {
                target: install_root.clone(),
            });
        }
        fs::remove_file(executable).map_err(InstallError::io_at(executable))?;
        println!("Removed {}...", executable.display());
        Ok(())
    }

    /// Remove the installed executable, its PATH entry and the temporary
    /// working directory.
    pub fn uninstall(&mut self) -> Result<UninstallOutcome, InstallError> {
        let result = self.run_uninstall();
        if let Err(e) = &result {
            tracing::debug!("Uninstall failed: {}", e);
        }
        self.cleanup(false);
        result
    }

    fn run_uninstall(&mut self) -> Result<UninstallOutcome, InstallError> {
        let install_root = self.settings.install_root.clone();
        let executable = self.settings.executable_path();

        if !executable.is_file() {
            println!(
                "{} is not installed in {}",
                self.settings.product_name,
                install_root.display()
            );
            return Ok(UninstallOutcome::NotInstalled);
        }

        self.remove_executable(&executable)?;

        let path_updated = remove_from_path(&self.env, &install_root)
            .map_err(InstallError::io_at(&install_root))?;
        if path_updated {
            println!("Removed {} from PATH...", install_root.display());
        }

        remove_working_dir(&self.settings.tmp_dir())
            .map_err(InstallError::io_at(&install_root))?;
        match fs::remove_dir(&install_root) {
            Ok(()) => tracing::debug!("Removed empty {}", install_root.display()),
            Err(e) => tracing::debug!("Leaving {} in place: {}", install_root.display(), e),
        }

        Ok(UninstallOutcome::Removed { path_updated })
    }

    /// Remove the temporary working directory, logging instead of failing.
    pub fn cleanup(&self, verbose: bool) {
        if verbose {
            println!("Cleaning up...");
        }
        if let Err(e) = remove_working_dir(&self.settings.tmp_dir()) {
            tracing::warn!(
                "Could not remove {}: {}",
                self.settings.tmp_dir().display(),
                e
            );
        }
        if verbose {
            println!("Done...");
        }
    }
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed,
/// leaving the default behaviour in place.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::debug!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

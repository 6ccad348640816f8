use crate::cli::Cli;
use crate::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "kryer-installer";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub fn get_config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KRYER_INSTALLER_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let path = dirs::config_dir()?.join(APP_NAME).join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Some(path)
}

/// Defaults, overlaid by the optional config file, then by environment
/// variables.
pub fn load_settings() -> Result<InstallerSettings> {
    let mut settings = match get_config_file_path() {
        Some(config_path) if config_path.exists() => {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Could not read config file at {}", config_path.display())
            })?;
            serde_json::from_str(&content).with_context(|| {
                format!("Could not parse config file {} as JSON", config_path.display())
            })?
        }
        _ => InstallerSettings::default(),
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn apply_env_overrides<F>(settings: &mut InstallerSettings, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(repo) = var("KRYER_REPO") {
        settings.repo = repo;
    }
    if let Some(api_url) = var("KRYER_API_URL") {
        settings.api_url = api_url;
    }
    if let Some(install_root) = var("KRYER_INSTALL_ROOT") {
        settings.install_root = PathBuf::from(install_root);
    }
    if let Some(exe_name) = var("KRYER_EXE_NAME") {
        settings.exe_name = exe_name;
    }
    if let Some(platform) = var("KRYER_PLATFORM") {
        settings.platform_marker = platform;
    }
    if let Some(profile) = var("KRYER_PATH_PROFILE") {
        settings.path_profile = PathBuf::from(profile);
    }
}

pub fn apply_cli_overrides(settings: &mut InstallerSettings, cli: &Cli) {
    if let Some(install_root) = &cli.install_root {
        settings.install_root = install_root.clone();
    }
    if let Some(repo) = &cli.repo {
        settings.repo = repo.clone();
    }
    if let Some(api_url) = &cli.api_url {
        settings.api_url = api_url.clone();
    }
}

mod checksum;
mod cleanup;
mod cli;
mod config;
mod download;
mod environment;
mod error;
mod install;
mod platform;
mod types;


use anyhow::{anyhow, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::{apply_cli_overrides, load_settings};
use environment::MachineEnvironment;
use error::InstallError;
use install::{InstallOutcome, Installer, UninstallOutcome};
use std::io;
use types::InstallerSettings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    let system_info = platform::get_system_info();
    tracing::debug!("Running on {}/{}", system_info.os, system_info.arch);

    // Load configuration
    let mut settings = load_settings()?;
    apply_cli_overrides(&mut settings, &cli);

    let command = cli.command.unwrap_or(Commands::Install {
        yes: false,
        tag: None,
    });

    let result = match command {
        Commands::Version => {
            println!("kryer-installer v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        Commands::Config { format } => {
            let output = match format.as_str() {
                "json" => serde_json::to_string_pretty(&settings)?,
                "yaml" => serde_yaml::to_string(&settings)?,
                other => return Err(anyhow!("Unknown format '{}'. Use json or yaml", other)),
            };
            println!("{}", output);
            return Ok(());
        }

        Commands::Clean => {
            let tmp_dir = settings.tmp_dir();
            cleanup::remove_working_dir(&tmp_dir)
                .map(|removed| {
                    if removed {
                        println!("Removed {}", tmp_dir.display());
                    } else {
                        println!("Nothing to clean in {}", settings.install_root.display());
                    }
                })
                .map_err(InstallError::io_at(&tmp_dir))
        }

        Commands::Install { yes, tag } => {
            let mut installer = new_installer(settings)?.assume_yes(yes);
            tracing::info!("Installing from {}", installer.settings().repo);
            installer.install(tag.as_deref()).await.map(|outcome| {
                if let InstallOutcome::Installed {
                    executable,
                    path_update,
                } = outcome
                {
                    tracing::info!("Installed {} ({:?})", executable.display(), path_update);
                }
            })
        }

        Commands::Uninstall => {
            let mut installer = new_installer(settings)?;
            installer.uninstall().map(|outcome| {
                if let UninstallOutcome::Removed { path_updated } = outcome {
                    tracing::info!("PATH updated: {}", path_updated);
                    println!("Uninstalled {}", installer.settings().product_name);
                }
            })
        }
    };

    let (exit_code, interrupted) = match result {
        Ok(()) => (0, false),
        Err(e) => {
            eprintln!("Error: {}", e);
            (e.exit_code(), matches!(e, InstallError::Interrupted))
        }
    };

    pause_before_exit(cli.no_pause || interrupted);
    std::process::exit(exit_code);
}

fn new_installer(
    settings: InstallerSettings,
) -> Result<Installer<MachineEnvironment, io::StdinLock<'static>>, InstallError> {
    #[cfg(windows)]
    let env = MachineEnvironment::new();
    #[cfg(not(windows))]
    let env = MachineEnvironment::new(settings.path_profile.clone());

    Installer::new(settings, env, io::stdin().lock())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

/// Keep a double-clicked console window open until the user has read the
/// output.
fn pause_before_exit(no_pause: bool) {
    if no_pause || !console::user_attended() {
        return;
    }
    println!("Press any key to exit...");
    if let Err(e) = console::Term::stdout().read_key() {
        tracing::debug!("Could not wait for key press: {}", e);
    }
}

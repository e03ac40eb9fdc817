//! pvsetup CLI - set up and mount the persistent volume.
//!
//! Finds the volume by its UUID or initializes an unused disk as the volume,
//! mounts it and ensures the requested directories exist on it. Running it
//! again once the volume is mounted does nothing.

use std::path::PathBuf;

use clap::Parser;
use pvsetup_core::config::{DEFAULT_TARGET_UUID, parse_dir_specs};
use pvsetup_core::crypt::DEFAULT_MAPPER_NAME;
use pvsetup_core::setup::{self, Outcome};
use pvsetup_core::{Passphrase, SystemDeviceOps, SystemProvisioner, VolumeConfig};
use tracing_subscriber::{EnvFilter, fmt};

/// Persistent volume setup tool.
#[derive(Parser)]
#[command(name = "pvsetup")]
#[command(about = "Find or create the persistent volume and mount it", long_about = None)]
struct Cli {
    /// Where to mount the volume.
    mountpoint: PathBuf,

    /// Directories to ensure on the volume, as `group:user:relative/path`.
    ///
    /// User and group are optional; an empty group defaults to the user.
    ensure_subdirs: Vec<String>,

    /// Use an encrypted (LUKS2) volume unlocked with this passphrase.
    #[arg(
        long,
        value_name = "PASSPHRASE",
        env = "PVSETUP_PASSPHRASE",
        hide_env_values = true
    )]
    encrypted: Option<String>,

    /// Like `--encrypted`, reading the passphrase from a file.
    ///
    /// Takes precedence over `--encrypted` and `PVSETUP_PASSPHRASE`.
    #[arg(long, value_name = "PATH")]
    encrypted_file: Option<PathBuf>,

    /// UUID identifying the volume.
    #[arg(long, default_value = DEFAULT_TARGET_UUID)]
    uuid: String,

    /// Name of the mapped device for an encrypted volume.
    #[arg(long, default_value = DEFAULT_MAPPER_NAME)]
    mapper_name: String,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long)]
    debug: bool,
}

fn build_config(cli: Cli) -> pvsetup_core::Result<VolumeConfig> {
    let passphrase = match (cli.encrypted_file, cli.encrypted) {
        (Some(path), _) => Some(Passphrase::from_file(&path)?),
        (None, Some(value)) => Some(Passphrase::new(value)),
        (None, None) => None,
    };

    let mut config = VolumeConfig::new(cli.mountpoint).with_dirs(parse_dir_specs(&cli.ensure_subdirs)?);
    config.target_uuid = cli.uuid;
    config.mapper_name = cli.mapper_name;
    config.passphrase = passphrase;
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let result = build_config(cli)
        .and_then(|config| setup::run(&SystemDeviceOps, &SystemProvisioner, &config));

    match result {
        Ok(Outcome::AlreadyMounted { device, mountpoint }) => {
            tracing::info!("{} already mounted at {}", device.display(), mountpoint);
        }
        Ok(Outcome::Mounted { device, formatted }) => {
            tracing::info!(formatted, "{} mounted", device.display());
        }
        Err(e) => {
            tracing::error!("volume setup failed: {}", e);
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

//! Volume setup flow.
//!
//! Locate the volume by UUID, otherwise pick and initialize a blank disk,
//! then check, mount and provision it. Every step is forward-only: a
//! failure aborts the run, and the next run starts over from a fresh
//! inventory (a volume formatted before the failure is found by UUID then).

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::VolumeConfig;
use crate::disk::BlockDevice;
use crate::error::Result;
use crate::locate::{SelectionResult, locate_existing};
use crate::mount::evaluate_fsck_code;
use crate::ops::DeviceOps;
use crate::provision::{DirProvisioner, provision_dirs};
use crate::select::select_candidate;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The volume was already mounted; nothing was touched.
    AlreadyMounted { device: PathBuf, mountpoint: String },
    /// The volume was mounted by this run.
    Mounted {
        /// Device that was mounted (mapped device when encrypted).
        device: PathBuf,
        /// True if the volume was created by this run.
        formatted: bool,
    },
}

/// Decides which device backs the volume.
///
/// An existing volume always wins over blank disks.
pub fn discover(devices: &[BlockDevice], target_uuid: &str) -> Result<SelectionResult> {
    if let Some(found) = locate_existing(devices, target_uuid) {
        return Ok(found);
    }
    info!(uuid = target_uuid, "no existing volume, looking for an unused disk");
    let candidate = select_candidate(devices)?;
    Ok(SelectionResult::Fresh {
        device: candidate.path.clone(),
    })
}

/// Makes an existing volume usable, unlocking it when encrypted.
///
/// Returns the device to check and mount.
pub fn open_existing(ops: &impl DeviceOps, config: &VolumeConfig, device: &Path) -> Result<PathBuf> {
    match &config.passphrase {
        Some(passphrase) => {
            info!(device = %device.display(), mapper = %config.mapper_name, "unlocking volume");
            ops.luks_open(device, passphrase, &config.mapper_name)
        }
        None => Ok(device.to_path_buf()),
    }
}

/// Formats a blank disk as the volume and returns the device to mount.
///
/// Encrypted: LUKS2 container stamped with the target UUID, opened, and an
/// ext4 filesystem created inside. Plain: ext4 stamped with the target UUID.
pub fn initialize(ops: &impl DeviceOps, config: &VolumeConfig, device: &Path) -> Result<PathBuf> {
    info!(device = %device.display(), encrypted = config.is_encrypted(), "formatting device");

    let Some(passphrase) = &config.passphrase else {
        ops.format_filesystem(device, Some(&config.target_uuid))?;
        return Ok(device.to_path_buf());
    };

    ops.luks_format(device, passphrase)?;
    ops.luks_set_uuid(device, &config.target_uuid)?;
    let mapped = ops.luks_open(device, passphrase, &config.mapper_name)?;
    ops.format_filesystem(&mapped, None)?;
    Ok(mapped)
}

/// Runs the filesystem check, refusing to continue on uncorrected errors.
pub fn check_integrity(ops: &impl DeviceOps, device: &Path) -> Result<()> {
    info!(device = %device.display(), "checking filesystem");
    let code = ops.check_filesystem(device)?;
    evaluate_fsck_code(device, code)
}

/// Runs the whole setup.
pub fn run(
    ops: &impl DeviceOps,
    provisioner: &impl DirProvisioner,
    config: &VolumeConfig,
) -> Result<Outcome> {
    config.validate()?;

    let devices = ops.list_block_devices()?;
    let (device, formatted) = match discover(&devices, &config.target_uuid)? {
        SelectionResult::AlreadyMounted { device, mountpoint } => {
            if Path::new(&mountpoint) != config.mountpoint {
                warn!(
                    %mountpoint,
                    configured = %config.mountpoint.display(),
                    "volume is mounted somewhere else"
                );
            }
            info!(device = %device.display(), %mountpoint, "already mounted, doing nothing");
            return Ok(Outcome::AlreadyMounted { device, mountpoint });
        }
        SelectionResult::Existing { device } => (open_existing(ops, config, &device)?, false),
        SelectionResult::Fresh { device } => (initialize(ops, config, &device)?, true),
    };

    check_integrity(ops, &device)?;

    info!(device = %device.display(), mountpoint = %config.mountpoint.display(), "mounting");
    ops.mount(&device, &config.mountpoint)?;

    provision_dirs(provisioner, &config.mountpoint, &config.dirs)?;

    Ok(Outcome::Mounted { device, formatted })
}

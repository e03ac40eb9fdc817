//! Filesystem operations module.
//!
//! This module handles creating the ext4 filesystem, checking it with
//! `e2fsck` and mounting it.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::warn;

use crate::error::{Error, IoResultExt, Result};
use crate::executor;

/// Highest `e2fsck` exit code that still allows mounting.
///
/// 0 = clean, 1 = errors corrected, 2 = corrected and reboot advised,
/// 3 = both. 4 and up mean errors were left or the check itself failed.
pub const FSCK_MAX_NONFATAL: i32 = 3;

/// Creates a mount point directory if it doesn't exist.
pub fn create_mount_point(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).mount_point_context(path)?;
    }
    Ok(())
}

/// Creates an ext4 filesystem on `device`.
///
/// With `uuid` set the filesystem is stamped with it (`mkfs.ext4 -U`),
/// otherwise mkfs picks a random one.
pub fn format_filesystem(device: &Path, uuid: Option<&str>) -> Result<()> {
    let mut cmd = Command::new("mkfs.ext4");
    cmd.arg("-F");
    if let Some(uuid) = uuid {
        cmd.args(["-U", uuid]);
    }
    cmd.arg(device);

    executor::run_checked(&mut cmd).map_err(|e| Error::FormatFailed {
        device: device.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Runs `e2fsck -f -y` on `device` and returns its exit code.
pub fn check_filesystem(device: &Path) -> Result<i32> {
    executor::run_status(Command::new("e2fsck").args(["-f", "-y"]).arg(device))
}

/// Maps an `e2fsck` exit code to success or [`Error::FilesystemCorrupt`].
pub fn evaluate_fsck_code(device: &Path, code: i32) -> Result<()> {
    if (0..=FSCK_MAX_NONFATAL).contains(&code) {
        if code != 0 {
            warn!(device = %device.display(), code, "e2fsck corrected filesystem errors");
        }
        return Ok(());
    }
    Err(Error::FilesystemCorrupt {
        device: device.display().to_string(),
        code,
    })
}

/// Mounts a device to the specified mount point, creating the mount point first.
pub fn mount_device(device: &Path, mount_point: &Path) -> Result<()> {
    let failed = |e: Error| Error::MountFailed {
        device: device.display().to_string(),
        mountpoint: mount_point.to_path_buf(),
        message: e.to_string(),
    };

    create_mount_point(mount_point).map_err(failed)?;
    executor::run_checked(Command::new("mount").arg(device).arg(mount_point)).map_err(failed)?;
    Ok(())
}

//! Host capabilities the setup flow depends on.
//!
//! [`DeviceOps`] wraps every disk utility the volume setup drives, so the
//! decision logic can run against [`SystemDeviceOps`] on a real host or a
//! scripted fake in tests.

use std::path::{Path, PathBuf};

use crate::crypt::{self, Passphrase};
use crate::disk::{self, BlockDevice};
use crate::error::Result;
use crate::mount;

/// Block device operations.
pub trait DeviceOps {
    /// Reads the current block device forest. Never cached.
    fn list_block_devices(&self) -> Result<Vec<BlockDevice>>;

    /// Formats `device` as a LUKS2 container.
    fn luks_format(&self, device: &Path, passphrase: &Passphrase) -> Result<()>;

    /// Stamps the LUKS header of `device` with `uuid`.
    fn luks_set_uuid(&self, device: &Path, uuid: &str) -> Result<()>;

    /// Opens `device` under the mapper `name`, returning the mapped device path.
    fn luks_open(&self, device: &Path, passphrase: &Passphrase, name: &str) -> Result<PathBuf>;

    /// Creates a filesystem on `device`, optionally with a fixed UUID.
    fn format_filesystem(&self, device: &Path, uuid: Option<&str>) -> Result<()>;

    /// Runs the filesystem check and returns its exit code.
    fn check_filesystem(&self, device: &Path) -> Result<i32>;

    /// Mounts `device` at `mountpoint`, creating the directory if needed.
    fn mount(&self, device: &Path, mountpoint: &Path) -> Result<()>;
}

/// [`DeviceOps`] backed by lsblk, cryptsetup, mkfs.ext4, e2fsck and mount.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceOps;

impl DeviceOps for SystemDeviceOps {
    fn list_block_devices(&self) -> Result<Vec<BlockDevice>> {
        disk::list_block_devices()
    }

    fn luks_format(&self, device: &Path, passphrase: &Passphrase) -> Result<()> {
        crypt::luks_format(device, passphrase)
    }

    fn luks_set_uuid(&self, device: &Path, uuid: &str) -> Result<()> {
        crypt::luks_set_uuid(device, uuid)
    }

    fn luks_open(&self, device: &Path, passphrase: &Passphrase, name: &str) -> Result<PathBuf> {
        crypt::luks_open(device, passphrase, name)
    }

    fn format_filesystem(&self, device: &Path, uuid: Option<&str>) -> Result<()> {
        mount::format_filesystem(device, uuid)
    }

    fn check_filesystem(&self, device: &Path) -> Result<i32> {
        mount::check_filesystem(device)
    }

    fn mount(&self, device: &Path, mountpoint: &Path) -> Result<()> {
        mount::mount_device(device, mountpoint)
    }
}

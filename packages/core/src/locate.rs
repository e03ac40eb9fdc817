//! Existing volume lookup.
//!
//! A formatted volume's UUID is reported on the device that directly hosts
//! it, so only top-level devices are compared.

use std::path::PathBuf;

use tracing::info;

use crate::disk::BlockDevice;

/// What discovery decided to do with the volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    /// The volume exists and is already mounted; nothing to do.
    AlreadyMounted { device: PathBuf, mountpoint: String },
    /// The volume exists but is not mounted.
    Existing { device: PathBuf },
    /// A blank disk was chosen and must be initialized.
    Fresh { device: PathBuf },
}

/// Returns the first top-level device whose UUID equals `target_uuid`.
pub fn find_existing<'a>(devices: &'a [BlockDevice], target_uuid: &str) -> Option<&'a BlockDevice> {
    devices.iter().find(|d| d.uuid_or_empty() == target_uuid)
}

/// Looks for the volume carrying `target_uuid`.
///
/// Returns `None` if no top-level device carries it. The volume counts as
/// mounted if anything in its subtree is, which covers an encrypted volume
/// whose mapped device is the one mounted.
pub fn locate_existing(devices: &[BlockDevice], target_uuid: &str) -> Option<SelectionResult> {
    let device = find_existing(devices, target_uuid)?;
    info!(device = %device.path.display(), uuid = target_uuid, "found existing volume");

    let mounted = device
        .first_in_use()
        .and_then(|dev| dev.mountpoint().map(|mountpoint| (dev, mountpoint)));
    match mounted {
        Some((dev, mountpoint)) => Some(SelectionResult::AlreadyMounted {
            device: dev.path.clone(),
            mountpoint: mountpoint.to_string(),
        }),
        None => Some(SelectionResult::Existing {
            device: device.path.clone(),
        }),
    }
}

//! Blank disk selection.
//!
//! Picks the first top-level whole disk that nothing is mounted from, in
//! the order lsblk reports them.

use std::fmt;

use tracing::info;

use crate::disk::{BlockDevice, DISK_TYPE};
use crate::error::{Error, Result};

/// Why a candidate disk was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not a whole disk (partition, loop, crypt, ...).
    NotDisk { device_type: String },
    /// The disk itself is mounted.
    Mounted { mountpoints: Vec<String> },
    /// A partition or mapped device below the disk is mounted.
    ChildInUse { child: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotDisk { device_type } => {
                write!(f, "type is [{device_type}] not [{DISK_TYPE}]")
            }
            Rejection::Mounted { mountpoints } => {
                write!(f, "already mounted at {}", mountpoints.join(", "))
            }
            Rejection::ChildInUse { child } => write!(f, "has in use child {child}"),
        }
    }
}

/// Checks a single top-level device, returning why it can't be used, if it can't.
pub fn check_candidate(candidate: &BlockDevice) -> Option<Rejection> {
    if !candidate.is_disk() {
        return Some(Rejection::NotDisk {
            device_type: candidate.device_type.clone(),
        });
    }

    if candidate.is_mounted() {
        return Some(Rejection::Mounted {
            mountpoints: candidate
                .active_mountpoints()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
    }

    candidate
        .children
        .iter()
        .find_map(BlockDevice::first_in_use)
        .map(|child| Rejection::ChildInUse {
            child: child.name.clone(),
        })
}

/// Selects the first eligible blank disk.
///
/// Fails with [`Error::NoAvailableDisk`] if every device is rejected.
pub fn select_candidate(devices: &[BlockDevice]) -> Result<&BlockDevice> {
    for candidate in devices {
        match check_candidate(candidate) {
            Some(reason) => info!(device = %candidate.name, %reason, "rejecting candidate"),
            None => {
                info!(device = %candidate.name, "selected device");
                return Ok(candidate);
            }
        }
    }
    Err(Error::NoAvailableDisk)
}

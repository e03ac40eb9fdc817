//! Block device inventory using lsblk.
//!
//! The inventory is a forest: top-level devices as lsblk reports them, each
//! owning its partitions and mapped sub-devices. It is read fresh on every
//! call and never mutated; callers re-read after anything that changes the
//! kernel's view of the disks.

use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::executor;

/// lsblk `type` value for a whole disk.
pub const DISK_TYPE: &str = "disk";

/// A node in the block device forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    /// Kernel device name (e.g., "sda", "sda1", "persistent").
    pub name: String,
    /// Device type as reported by lsblk ("disk", "part", "crypt", "loop", ...).
    pub device_type: String,
    /// Filesystem or LUKS container UUID, if formatted.
    pub uuid: Option<String>,
    /// Every location the device is mounted at; `None` entries are placeholders
    /// lsblk emits for unmounted devices.
    pub mountpoints: Vec<Option<String>>,
    /// Partitions and mapped devices stacked on this one.
    pub children: Vec<BlockDevice>,
    /// Full device path (e.g., "/dev/sda").
    pub path: PathBuf,
}

impl BlockDevice {
    /// UUID for comparison purposes; a missing UUID compares as "".
    pub fn uuid_or_empty(&self) -> &str {
        self.uuid.as_deref().unwrap_or("")
    }

    /// Returns true if this is a whole disk.
    pub fn is_disk(&self) -> bool {
        self.device_type == DISK_TYPE
    }

    /// Mountpoints that are actually populated (non-null and non-empty).
    pub fn active_mountpoints(&self) -> Vec<&str> {
        self.mountpoints
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .collect()
    }

    /// The first populated mountpoint, if the device is mounted.
    pub fn mountpoint(&self) -> Option<&str> {
        self.active_mountpoints().into_iter().next()
    }

    /// Returns true if this device is mounted directly.
    pub fn is_mounted(&self) -> bool {
        self.mountpoint().is_some()
    }

    /// Returns true if this device or anything below it is mounted.
    pub fn in_use(&self) -> bool {
        self.first_in_use().is_some()
    }

    /// The first device in this subtree (depth-first, self first) that is mounted.
    pub fn first_in_use(&self) -> Option<&BlockDevice> {
        if self.is_mounted() {
            return Some(self);
        }
        self.children.iter().find_map(BlockDevice::first_in_use)
    }
}

/// Raw JSON structure from lsblk output.
#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(rename = "type", default)]
    device_type: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    // util-linux < 2.37 only has the singular column.
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    mountpoints: Option<Vec<Option<String>>>,
    #[serde(default)]
    children: Option<Vec<LsblkDevice>>,
}

impl From<LsblkDevice> for BlockDevice {
    fn from(dev: LsblkDevice) -> Self {
        let mut mountpoints = dev.mountpoints.unwrap_or_default();
        if mountpoints.iter().all(Option::is_none) && dev.mountpoint.is_some() {
            mountpoints = vec![dev.mountpoint];
        }
        let path = dev
            .path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("/dev/{}", dev.name)));

        BlockDevice {
            name: dev.name,
            device_type: dev.device_type.unwrap_or_default(),
            uuid: dev.uuid,
            mountpoints,
            children: dev
                .children
                .unwrap_or_default()
                .into_iter()
                .map(BlockDevice::from)
                .collect(),
            path,
        }
    }
}

/// Parses `lsblk --json` output into the device forest.
pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>> {
    let output: LsblkOutput = serde_json::from_str(json).map_err(|e| Error::InventoryUnavailable {
        message: format!("failed to parse lsblk output: {e}"),
    })?;
    Ok(output
        .blockdevices
        .into_iter()
        .map(BlockDevice::from)
        .collect())
}

/// Lists all block devices on the system.
///
/// Calls `lsblk --json --output-all --tree` and parses the output. Any
/// failure, including lsblk being absent, is reported as
/// [`Error::InventoryUnavailable`].
pub fn list_block_devices() -> Result<Vec<BlockDevice>> {
    let output = executor::run_checked(
        Command::new("lsblk").args(["--json", "--output-all", "--tree"]),
    )
    .map_err(|e| Error::InventoryUnavailable {
        message: e.to_string(),
    })?;

    parse_lsblk(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LSBLK_JSON: &str = r#"{
        "blockdevices": [
            {
                "name": "nvme0n1",
                "path": "/dev/nvme0n1",
                "type": "disk",
                "uuid": null,
                "mountpoints": [null],
                "children": [
                    {
                        "name": "nvme0n1p1",
                        "path": "/dev/nvme0n1p1",
                        "type": "part",
                        "uuid": "1234-5678",
                        "mountpoints": ["/boot"]
                    },
                    {
                        "name": "nvme0n1p2",
                        "path": "/dev/nvme0n1p2",
                        "type": "part",
                        "uuid": "0b1c2d3e-aaaa-bbbb-cccc-000000000000",
                        "mountpoints": [null],
                        "children": [
                            {
                                "name": "root",
                                "path": "/dev/mapper/root",
                                "type": "crypt",
                                "uuid": "9f8e7d6c-1111-2222-3333-444444444444",
                                "mountpoints": ["/nix/store", "/"]
                            }
                        ]
                    }
                ]
            },
            {
                "name": "sda",
                "type": "disk",
                "uuid": "f457cacd-85a9-4449-bb30-2e5b09fa0bc8",
                "mountpoints": [null]
            },
            {
                "name": "loop0",
                "type": "loop",
                "uuid": null,
                "mountpoints": [null],
                "children": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_lsblk_json() {
        let devices = parse_lsblk(SAMPLE_LSBLK_JSON).unwrap();
        assert_eq!(devices.len(), 3);

        let nvme = &devices[0];
        assert!(nvme.is_disk());
        assert_eq!(nvme.children.len(), 2);
        assert_eq!(nvme.children[1].children[0].path, PathBuf::from("/dev/mapper/root"));

        // No path column falls back to /dev/<name>
        let sda = &devices[1];
        assert_eq!(sda.path, PathBuf::from("/dev/sda"));
        assert_eq!(sda.uuid_or_empty(), "f457cacd-85a9-4449-bb30-2e5b09fa0bc8");
        assert!(sda.children.is_empty());

        assert_eq!(devices[2].device_type, "loop");
        assert_eq!(devices[2].uuid_or_empty(), "");
    }

    #[test]
    fn test_legacy_mountpoint_column() {
        let json = r#"{"blockdevices": [
            {"name": "sdb", "type": "disk", "mountpoint": "/mnt/old"},
            {"name": "sdc", "type": "disk", "mountpoint": null}
        ]}"#;
        let devices = parse_lsblk(json).unwrap();
        assert_eq!(devices[0].mountpoints, vec![Some("/mnt/old".to_string())]);
        assert_eq!(devices[0].mountpoint(), Some("/mnt/old"));
        assert!(!devices[1].is_mounted());
    }

    #[test]
    fn test_in_use_is_recursive() {
        let devices = parse_lsblk(SAMPLE_LSBLK_JSON).unwrap();
        let nvme = &devices[0];
        assert!(!nvme.is_mounted());
        assert!(nvme.in_use());
        assert_eq!(nvme.first_in_use().map(|d| d.name.as_str()), Some("nvme0n1p1"));
        assert_eq!(
            nvme.children[1].first_in_use().map(|d| d.name.as_str()),
            Some("root")
        );
        assert!(!devices[1].in_use());
    }

    #[test]
    fn test_active_mountpoints() {
        let devices = parse_lsblk(SAMPLE_LSBLK_JSON).unwrap();
        let root = &devices[0].children[1].children[0];
        assert_eq!(root.active_mountpoints(), vec!["/nix/store", "/"]);
        assert_eq!(root.mountpoint(), Some("/nix/store"));
    }

    #[test]
    fn test_empty_mountpoint_is_not_mounted() {
        let json = r#"{"blockdevices": [
            {"name": "sdb", "type": "disk", "mountpoints": ["", null]}
        ]}"#;
        let devices = parse_lsblk(json).unwrap();
        assert!(devices[0].active_mountpoints().is_empty());
        assert_eq!(devices[0].mountpoint(), None);
        assert!(!devices[0].is_mounted());
        assert!(!devices[0].in_use());
    }

    #[test]
    fn test_malformed_output() {
        let err = parse_lsblk("lsblk: unknown column").unwrap_err();
        assert!(matches!(err, Error::InventoryUnavailable { .. }));

        let err = parse_lsblk(r#"{"devices": []}"#).unwrap_err();
        assert!(matches!(err, Error::InventoryUnavailable { .. }));
    }
}

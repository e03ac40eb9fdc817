//! pvsetup-core: Core library for persistent volume setup.
//!
//! This library finds, creates and mounts a single persistent volume,
//! optionally LUKS encrypted, identified by a fixed UUID. Running it again
//! against an already configured machine finds the volume and never
//! reformats it.
//!
//! # Modules
//!
//! - [`disk`]: Block device inventory using `lsblk`
//! - [`locate`]: Finding the existing volume by UUID
//! - [`select`]: Choosing an unused disk for a new volume
//! - [`crypt`]: LUKS format/stamp/open via `cryptsetup`
//! - [`mount`]: ext4 creation, `e2fsck` and mounting
//! - [`ops`]: The [`DeviceOps`] seam over all of the above
//! - [`provision`]: Directory creation and ownership on the volume
//! - [`setup`]: The end-to-end flow
//! - [`config`]: Setup configuration
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use pvsetup_core::{SystemDeviceOps, SystemProvisioner, VolumeConfig, setup};
//! use pvsetup_core::config::parse_dir_specs;
//!
//! let config = VolumeConfig::new("/mnt/persistent")
//!     .with_dirs(parse_dir_specs(["users:alice:home/alice"]).unwrap());
//!
//! // Requires root and real disks:
//! match setup::run(&SystemDeviceOps, &SystemProvisioner, &config).unwrap() {
//!     setup::Outcome::AlreadyMounted { .. } => println!("nothing to do"),
//!     setup::Outcome::Mounted { device, .. } => println!("mounted {}", device.display()),
//! }
//! ```

pub mod config;
pub mod crypt;
pub mod disk;
pub mod error;
pub mod executor;
pub mod locate;
pub mod mount;
pub mod ops;
pub mod provision;
pub mod select;
pub mod setup;

// Re-export commonly used types
pub use config::VolumeConfig;
pub use crypt::Passphrase;
pub use disk::BlockDevice;
pub use error::{Error, Result};
pub use locate::SelectionResult;
pub use ops::{DeviceOps, SystemDeviceOps};
pub use provision::{DirProvisioner, DirSpec, SystemProvisioner};
pub use setup::Outcome;

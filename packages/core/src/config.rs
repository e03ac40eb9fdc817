//! Volume setup configuration.
//!
//! Everything the setup flow needs is carried in one [`VolumeConfig`] value
//! that is passed down explicitly.

use std::path::PathBuf;

use crate::crypt::{DEFAULT_MAPPER_NAME, Passphrase};
use crate::error::{Error, Result};
use crate::provision::DirSpec;

/// Stable identifier of the persistent volume.
pub const DEFAULT_TARGET_UUID: &str = "f457cacd-85a9-4449-bb30-2e5b09fa0bc8";

#[derive(Debug, Clone)]
pub struct VolumeConfig {
    /// UUID the volume is recognized by, stamped at format time.
    pub target_uuid: String,
    /// Name of the mapped device when encrypted.
    pub mapper_name: String,
    /// Where the volume is mounted.
    pub mountpoint: PathBuf,
    /// Set to use (and create) an encrypted volume.
    pub passphrase: Option<Passphrase>,
    /// Directories ensured under the mountpoint after mounting.
    pub dirs: Vec<DirSpec>,
}

impl VolumeConfig {
    /// Creates a configuration with the default UUID and mapper name.
    pub fn new(mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            target_uuid: DEFAULT_TARGET_UUID.to_string(),
            mapper_name: DEFAULT_MAPPER_NAME.to_string(),
            mountpoint: mountpoint.into(),
            passphrase: None,
            dirs: Vec::new(),
        }
    }

    pub fn with_passphrase(mut self, passphrase: Passphrase) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    pub fn with_dirs(mut self, dirs: Vec<DirSpec>) -> Self {
        self.dirs = dirs;
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Rejects values that would make discovery or mapping misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.target_uuid.is_empty() {
            return Err(Error::InvalidConfig {
                message: "target UUID must not be empty".to_string(),
            });
        }
        if self.mapper_name.is_empty() || self.mapper_name.contains('/') {
            return Err(Error::InvalidConfig {
                message: format!("invalid mapper name '{}'", self.mapper_name),
            });
        }
        if self.mountpoint.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "mountpoint must not be empty".to_string(),
            });
        }
        if self.passphrase.as_ref().is_some_and(|p| p.as_bytes().is_empty()) {
            return Err(Error::InvalidConfig {
                message: "passphrase must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses `group:user:path` directory specs, failing on the first bad one.
pub fn parse_dir_specs<I, S>(specs: I) -> Result<Vec<DirSpec>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    specs.into_iter().map(|s| s.as_ref().parse()).collect()
}

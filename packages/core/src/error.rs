//! Unified error types for the pvsetup-core library.
//!
//! Uses SNAFU for context-rich error handling. Every variant is fatal: the
//! tool never retries, it reports which step failed and stops.

use snafu::{ResultExt, Snafu};
use std::path::PathBuf;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all core library operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Failed to execute a system command.
    #[snafu(display("failed to execute command '{command}': {source}"))]
    CommandExecution {
        command: String,
        source: std::io::Error,
    },

    /// Command executed but returned non-zero exit code.
    #[snafu(display("command '{command}' exited with code {code}: {stderr}"))]
    CommandExit {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The block device listing could not be obtained or parsed.
    #[snafu(display("block device inventory unavailable: {message}"))]
    InventoryUnavailable { message: String },

    /// No unused whole disk is attached.
    #[snafu(display("no unused disk available to set up the volume"))]
    NoAvailableDisk,

    /// Formatting (encrypted container or filesystem) failed.
    #[snafu(display("failed to format {device}: {message}"))]
    FormatFailed { device: String, message: String },

    /// The encrypted container could not be opened.
    #[snafu(display("failed to unlock {device}: {message}"))]
    UnlockFailed { device: String, message: String },

    /// `e2fsck` reported errors it could not correct.
    #[snafu(display("filesystem on {device} is corrupt (e2fsck exit code {code})"))]
    FilesystemCorrupt { device: String, code: i32 },

    /// Mount point creation failed.
    #[snafu(display("failed to create mount point at {}", path.display()))]
    MountPointCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Mount operation failed.
    #[snafu(display("failed to mount {device} at {}: {message}", mountpoint.display()))]
    MountFailed {
        device: String,
        mountpoint: PathBuf,
        message: String,
    },

    /// A directory on the mounted volume could not be created or chowned.
    #[snafu(display("failed to provision {}: {message}", path.display()))]
    ProvisioningFailed { path: PathBuf, message: String },

    /// A `group:user:path` directory spec is malformed.
    #[snafu(display("invalid directory spec '{spec}': {reason}"))]
    InvalidDirSpec { spec: String, reason: String },

    /// A configuration value is unusable.
    #[snafu(display("invalid configuration: {message}"))]
    InvalidConfig { message: String },

    /// The passphrase file could not be read.
    #[snafu(display("failed to read passphrase from {}", path.display()))]
    PassphraseRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Extension trait for adding context to io::Error results.
pub trait IoResultExt<T> {
    /// Add context for command execution errors.
    fn command_context(self, command: impl Into<String>) -> Result<T>;

    /// Add context for mount point creation errors.
    fn mount_point_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for passphrase file read errors.
    fn passphrase_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn command_context(self, command: impl Into<String>) -> Result<T> {
        self.context(CommandExecutionSnafu {
            command: command.into(),
        })
    }

    fn mount_point_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(MountPointCreationSnafu { path: path.into() })
    }

    fn passphrase_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(PassphraseReadSnafu { path: path.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_failed_step() {
        let err = Error::FormatFailed {
            device: "/dev/sdb".to_string(),
            message: "mkfs.ext4 exited with code 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to format /dev/sdb: mkfs.ext4 exited with code 1"
        );

        let err = Error::FilesystemCorrupt {
            device: "/dev/mapper/persistent".to_string(),
            code: 4,
        };
        assert!(err.to_string().contains("exit code 4"));
    }

    #[test]
    fn test_command_context() {
        let io: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not found",
        ));
        let err = io.command_context("lsblk").unwrap_err();
        assert!(matches!(err, Error::CommandExecution { ref command, .. } if command == "lsblk"));
    }
}

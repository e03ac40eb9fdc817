//! LUKS operations via cryptsetup.
//!
//! Passphrases are always written to cryptsetup's stdin (`--key-file=-`),
//! never passed as arguments.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::executor;

/// Default name of the mapped device the volume is opened under.
pub const DEFAULT_MAPPER_NAME: &str = "persistent";

/// A LUKS passphrase. Wiped from memory on drop and redacted from `Debug`.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Reads a passphrase from a file, dropping one trailing newline.
    pub fn from_file(path: &Path) -> Result<Self> {
        use crate::error::IoResultExt;

        let mut raw = Zeroizing::new(std::fs::read_to_string(path).passphrase_context(path)?);
        if raw.ends_with('\n') {
            raw.pop();
            if raw.ends_with('\r') {
                raw.pop();
            }
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// Returns the path of the mapped device for `name`.
pub fn mapper_path(name: &str) -> PathBuf {
    Path::new("/dev/mapper").join(name)
}

/// Formats `device` as a LUKS2 container.
///
/// Runs `cryptsetup luksFormat --type=luks2 --batch-mode --key-file=- <device>`.
pub fn luks_format(device: &Path, passphrase: &Passphrase) -> Result<()> {
    executor::run_with_stdin(
        Command::new("cryptsetup")
            .args(["luksFormat", "--type=luks2", "--batch-mode", "--key-file=-"])
            .arg(device),
        passphrase.as_bytes(),
    )
    .map_err(|e| Error::FormatFailed {
        device: device.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Sets the LUKS header UUID of `device`.
///
/// Runs `cryptsetup luksUUID --uuid <uuid> <device>`.
pub fn luks_set_uuid(device: &Path, uuid: &str) -> Result<()> {
    executor::run_checked(
        Command::new("cryptsetup")
            .args(["luksUUID", "--batch-mode", "--uuid", uuid])
            .arg(device),
    )
    .map_err(|e| Error::FormatFailed {
        device: device.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Opens `device` as `/dev/mapper/<name>` and returns that path.
///
/// Runs `cryptsetup open --key-file=- <device> <name>`. Opening a container
/// that is already open fails.
pub fn luks_open(device: &Path, passphrase: &Passphrase, name: &str) -> Result<PathBuf> {
    executor::run_with_stdin(
        Command::new("cryptsetup")
            .args(["open", "--key-file=-"])
            .arg(device)
            .arg(name),
        passphrase.as_bytes(),
    )
    .map_err(|e| Error::UnlockFailed {
        device: device.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(mapper_path(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mapper_path() {
        assert_eq!(
            mapper_path(DEFAULT_MAPPER_NAME),
            PathBuf::from("/dev/mapper/persistent")
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let pass = Passphrase::new("hunter2");
        assert!(!format!("{pass:?}").contains("hunter2"));
    }

    #[test]
    fn test_from_file_strips_one_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"  spaced pass \n").unwrap();
        let pass = Passphrase::from_file(file.path()).unwrap();
        assert_eq!(pass.as_bytes(), b"  spaced pass ");
    }

    #[test]
    fn test_from_missing_file() {
        let err = Passphrase::from_file(Path::new("/nonexistent/pvsetup/key")).unwrap_err();
        assert!(matches!(err, Error::PassphraseRead { .. }));
    }
}

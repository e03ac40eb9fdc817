//! Directory provisioning on the mounted volume.
//!
//! Directory specs have the form `group:user:relative/path`, parsed from the
//! right: `path`, `user:path` and `group:user:path` are all accepted. An
//! empty group defaults to the user. Without a user, ownership is left alone.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use nix::unistd::{Group, User, chown};
use tracing::info;

use crate::error::{Error, Result};

/// Owner applied to a provisioned directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user: String,
    pub group: String,
}

/// A directory to ensure under the mountpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSpec {
    /// Path relative to the mountpoint.
    pub path: PathBuf,
    pub owner: Option<Owner>,
}

impl FromStr for DirSpec {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidDirSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = spec.rsplitn(3, ':');
        let path = parts.next().unwrap_or_default();
        let user = parts.next().unwrap_or_default();
        let group = parts.next().unwrap_or_default();

        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return Err(invalid("path must be relative to the mountpoint"));
        }
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(invalid("path must not contain '..'"));
        }

        let owner = (!user.is_empty()).then(|| Owner {
            user: user.to_string(),
            group: (if group.is_empty() { user } else { group }).to_string(),
        });

        Ok(DirSpec { path, owner })
    }
}

/// Creates directories and applies ownership.
pub trait DirProvisioner {
    /// Creates `path` and its parents, then chowns `path` if `owner` is set.
    fn ensure_dir(&self, path: &Path, owner: Option<&Owner>) -> Result<()>;
}

/// [`DirProvisioner`] acting on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvisioner;

impl DirProvisioner for SystemProvisioner {
    fn ensure_dir(&self, path: &Path, owner: Option<&Owner>) -> Result<()> {
        let failed = |message: String| Error::ProvisioningFailed {
            path: path.to_path_buf(),
            message,
        };

        fs::create_dir_all(path).map_err(|e| failed(e.to_string()))?;

        let Some(owner) = owner else {
            return Ok(());
        };
        let user = User::from_name(&owner.user)
            .map_err(|e| failed(format!("failed to look up user {}: {e}", owner.user)))?
            .ok_or_else(|| failed(format!("unknown user {}", owner.user)))?;
        let group = Group::from_name(&owner.group)
            .map_err(|e| failed(format!("failed to look up group {}: {e}", owner.group)))?
            .ok_or_else(|| failed(format!("unknown group {}", owner.group)))?;

        chown(path, Some(user.uid), Some(group.gid))
            .map_err(|e| failed(format!("chown {}:{} failed: {e}", owner.user, owner.group)))
    }
}

/// Ensures every spec'd directory exists under `root`, in order.
pub fn provision_dirs(provisioner: &impl DirProvisioner, root: &Path, specs: &[DirSpec]) -> Result<()> {
    for spec in specs {
        let path = root.join(&spec.path);
        info!(path = %path.display(), "ensuring directory");
        provisioner.ensure_dir(&path, spec.owner.as_ref())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{Gid, Uid};

    fn owner(user: &str, group: &str) -> Option<Owner> {
        Some(Owner {
            user: user.to_string(),
            group: group.to_string(),
        })
    }

    #[test]
    fn test_parse_full_spec() {
        let spec: DirSpec = "media:jellyfin:srv/media".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from("srv/media"));
        assert_eq!(spec.owner, owner("jellyfin", "media"));
    }

    #[test]
    fn test_empty_group_defaults_to_user() {
        let spec: DirSpec = ":postgres:var/lib/postgresql".parse().unwrap();
        assert_eq!(spec.owner, owner("postgres", "postgres"));

        let spec: DirSpec = "postgres:var/lib/postgresql".parse().unwrap();
        assert_eq!(spec.owner, owner("postgres", "postgres"));
    }

    #[test]
    fn test_path_only() {
        let spec: DirSpec = "home".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from("home"));
        assert_eq!(spec.owner, None);

        let spec: DirSpec = "::home".parse().unwrap();
        assert_eq!(spec.owner, None);
    }

    #[test]
    fn test_invalid_specs() {
        for spec in ["", "user:", "/etc", "root:root:/etc", "a/../../etc"] {
            assert!(
                matches!(spec.parse::<DirSpec>(), Err(Error::InvalidDirSpec { .. })),
                "{spec} should be rejected"
            );
        }
    }

    #[test]
    fn test_system_provisioner_creates_parents() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("a/b/c");
        SystemProvisioner.ensure_dir(&path, None).unwrap();
        assert!(path.is_dir());
        SystemProvisioner.ensure_dir(&path, None).unwrap();
    }

    #[test]
    fn test_system_provisioner_chowns_to_current_user() {
        let Ok(Some(user)) = User::from_uid(Uid::current()) else {
            return;
        };
        let Ok(Some(group)) = Group::from_gid(Gid::current()) else {
            return;
        };
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("owned");
        SystemProvisioner
            .ensure_dir(&path, owner(&user.name, &group.name).as_ref())
            .unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn test_system_provisioner_unknown_user() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("x");
        let err = SystemProvisioner
            .ensure_dir(&path, owner("pvsetup-no-such-user", "pvsetup-no-such-user").as_ref())
            .unwrap_err();
        assert!(matches!(err, Error::ProvisioningFailed { .. }));
    }

    #[test]
    fn test_provision_dirs_joins_root() {
        let root = tempfile::tempdir().unwrap();
        let specs = vec![
            "one".parse::<DirSpec>().unwrap(),
            "two/three".parse::<DirSpec>().unwrap(),
        ];
        provision_dirs(&SystemProvisioner, root.path(), &specs).unwrap();
        assert!(root.path().join("one").is_dir());
        assert!(root.path().join("two/three").is_dir());
    }
}

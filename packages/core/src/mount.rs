//! Share mount operations.
//!
//! Mounts and unmounts CIFS shares of the configured server under the mount
//! base. Unmounts are always forced (`umount -f`): detaching a stuck share is
//! preferred over waiting on in-flight writes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{CIFS_FSTYPE, ManagerConfig, ServiceIdentity};
use crate::credentials::CredentialStore;
use crate::error::{Error, IoResultExt, Result};
use crate::executor::CommandRunner;
use crate::mount_table::{MountEntry, MountInspector};
use crate::options::CifsOptions;
use crate::privilege::Privileged;

/// A remote share and where it is mounted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub name: String,
    pub mount_point: PathBuf,
}

impl Share {
    /// Builds a share under `mount_base`, rejecting names that would escape it.
    pub fn new(mount_base: &Path, name: &str) -> Result<Self> {
        validate_share_name(name)?;
        Ok(Self {
            name: name.to_string(),
            mount_point: mount_base.join(name),
        })
    }

    /// Remote path `//server/name`.
    pub fn remote_path(&self, server: &str) -> String {
        format!("//{}/{}", server, self.name)
    }
}

/// Checks that a share name maps to exactly one directory under the base.
pub fn validate_share_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else if name.contains('/') || name.contains('\\') {
        Some("name contains a path separator")
    } else if name.chars().any(char::is_control) {
        Some("name contains control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidShareName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Creates a mount point directory if it doesn't exist.
pub fn create_mount_point(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).mount_point_context(path)?;
    }
    Ok(())
}

/// Result of a successful unmount request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountOutcome {
    Unmounted,
    /// Nothing was mounted there; no command was run.
    NotMounted,
}

/// Outcome of one entry during [`ShareOps::unmount_all`].
#[derive(Debug)]
pub struct UnmountReport {
    pub entry: MountEntry,
    pub result: Result<UnmountOutcome>,
}

/// Mount and unmount operations for one server.
pub struct ShareOps<'a> {
    config: &'a ManagerConfig,
    identity: ServiceIdentity,
    credentials: CredentialStore,
    runner: &'a dyn CommandRunner,
    inspector: &'a dyn MountInspector,
}

impl<'a> ShareOps<'a> {
    pub fn new(
        config: &'a ManagerConfig,
        identity: ServiceIdentity,
        runner: &'a dyn CommandRunner,
        inspector: &'a dyn MountInspector,
    ) -> Self {
        Self {
            config,
            identity,
            credentials: CredentialStore::new(&config.credentials_file),
            runner,
            inspector,
        }
    }

    /// Local mount point for a share name.
    pub fn share(&self, name: &str) -> Result<Share> {
        Share::new(&self.config.mount_base, name)
    }

    /// Mounts `//server/<name>` at `<mount_base>/<name>`.
    ///
    /// The OS error is returned verbatim on failure, including when the share
    /// is already mounted.
    pub fn mount(&self, _token: &Privileged, name: &str) -> Result<Share> {
        let share = self.share(name)?;
        self.credentials.require()?;
        create_mount_point(&share.mount_point)?;

        let remote = share.remote_path(&self.config.server);
        let options = CifsOptions::for_mount(self.config, self.identity).to_option_string();
        let target = share.mount_point.to_string_lossy().to_string();

        let output = self.runner.run(
            "mount",
            &["-t", CIFS_FSTYPE, remote.as_str(), target.as_str(), "-o", options.as_str()],
        )?;

        if !output.success() {
            return Err(Error::MountFailed {
                remote,
                path: share.mount_point,
                message: output.diagnostic(),
            });
        }

        info!(%remote, mount_point = %share.mount_point.display(), "mounted share");
        Ok(share)
    }

    /// Force-unmounts `mount_point` if it is mounted.
    ///
    /// The mount table lists resolved paths, so a mount point reached through
    /// a symlink is looked up by its canonical form as well.
    pub fn unmount(&self, _token: &Privileged, mount_point: &Path) -> Result<UnmountOutcome> {
        match self.mounted_target(mount_point)? {
            Some(target) => self.force_unmount(&target),
            None => Ok(UnmountOutcome::NotMounted),
        }
    }

    fn mounted_target(&self, mount_point: &Path) -> Result<Option<PathBuf>> {
        if self.inspector.is_mounted(mount_point)? {
            return Ok(Some(mount_point.to_path_buf()));
        }
        let Ok(resolved) = fs::canonicalize(mount_point) else {
            return Ok(None);
        };
        if resolved != mount_point && self.inspector.is_mounted(&resolved)? {
            return Ok(Some(resolved));
        }
        Ok(None)
    }

    /// Force-unmounts the mount point of a share name.
    pub fn unmount_share(&self, token: &Privileged, name: &str) -> Result<UnmountOutcome> {
        let share = self.share(name)?;
        self.unmount(token, &share.mount_point)
    }

    /// Force-unmounts every active CIFS mount, continuing past failures.
    ///
    /// Fails only if the mount table cannot be read.
    pub fn unmount_all(&self, _token: &Privileged) -> Result<Vec<UnmountReport>> {
        let entries = self.inspector.mounts_of_type(CIFS_FSTYPE)?;
        let mut reports = Vec::with_capacity(entries.len());

        for entry in entries {
            let result = self.force_unmount(&entry.target);
            if let Err(e) = &result {
                warn!(mount_point = %entry.target.display(), error = %e, "unmount failed, continuing");
            }
            reports.push(UnmountReport { entry, result });
        }

        Ok(reports)
    }

    /// Currently active CIFS mounts.
    pub fn active_shares(&self) -> Result<Vec<MountEntry>> {
        self.inspector.mounts_of_type(CIFS_FSTYPE)
    }

    fn force_unmount(&self, mount_point: &Path) -> Result<UnmountOutcome> {
        let target = mount_point.to_string_lossy().to_string();
        let output = self.runner.run("umount", &["-f", target.as_str()])?;

        if !output.success() {
            return Err(Error::UnmountFailed {
                path: mount_point.to_path_buf(),
                message: output.diagnostic(),
            });
        }

        info!(mount_point = %mount_point.display(), "unmounted");
        Ok(UnmountOutcome::Unmounted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeHost;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: ManagerConfig,
        host: FakeHost,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let credentials = dir.path().join("creds");
        fs::write(&credentials, "username=svc\npassword=pw\n").unwrap();

        let config = ManagerConfig {
            server: "10.0.0.25".to_string(),
            mount_base: dir.path().join("mnt"),
            credentials_file: credentials,
            ..Default::default()
        };

        Fixture {
            _dir: dir,
            config,
            host: FakeHost::new(),
        }
    }

    fn ops(fx: &Fixture) -> ShareOps<'_> {
        ShareOps::new(
            &fx.config,
            ServiceIdentity { uid: 33, gid: 33 },
            &fx.host,
            &fx.host,
        )
    }

    #[test]
    fn test_validate_share_name() {
        assert!(validate_share_name("Archives").is_ok());
        assert!(validate_share_name("My Share").is_ok());
        assert!(validate_share_name("").is_err());
        assert!(validate_share_name("..").is_err());
        assert!(validate_share_name("a/b").is_err());
        assert!(validate_share_name("a\\b").is_err());
        assert!(validate_share_name("a\nb").is_err());
    }

    #[test]
    fn test_share_paths() {
        let share = Share::new(Path::new("/mnt"), "Archives").unwrap();
        assert_eq!(share.mount_point, PathBuf::from("/mnt/Archives"));
        assert_eq!(share.remote_path("10.0.0.25"), "//10.0.0.25/Archives");
    }

    #[test]
    fn test_mount_then_unmount_round_trip() {
        let fx = fixture();
        let ops = ops(&fx);
        let token = Privileged::assume();

        let share = ops.mount(&token, "Archives").unwrap();
        assert!(share.mount_point.is_dir());
        assert!(fx.host.is_mounted(&share.mount_point).unwrap());

        let mount_cmd = &fx.host.commands()[0];
        assert_eq!(mount_cmd[0], "mount");
        assert!(mount_cmd.contains(&"//10.0.0.25/Archives".to_string()));
        assert!(
            mount_cmd
                .last()
                .unwrap()
                .ends_with("iocharset=utf8,vers=2.0,uid=33,gid=33")
        );

        assert_eq!(
            ops.unmount(&token, &share.mount_point).unwrap(),
            UnmountOutcome::Unmounted
        );
        assert!(!fx.host.is_mounted(&share.mount_point).unwrap());
    }

    #[test]
    fn test_unmount_not_mounted_is_benign() {
        let fx = fixture();
        let ops = ops(&fx);

        let outcome = ops.unmount_share(&Privileged::assume(), "Archives").unwrap();
        assert_eq!(outcome, UnmountOutcome::NotMounted);
        assert!(fx.host.commands().is_empty());
    }

    #[test]
    fn test_mount_requires_credentials() {
        let fx = fixture();
        fs::remove_file(&fx.config.credentials_file).unwrap();

        let err = ops(&fx).mount(&Privileged::assume(), "Archives").unwrap_err();
        assert!(matches!(err, Error::MissingCredentials { .. }));
        assert!(fx.host.commands().is_empty());
    }

    #[test]
    fn test_mount_failure_surfaces_os_message() {
        let fx = fixture();
        fx.host
            .fail_mounts_with("mount error(113): could not connect to 10.0.0.25");

        let err = ops(&fx).mount(&Privileged::assume(), "Archives").unwrap_err();
        match err {
            Error::MountFailed { message, .. } => {
                assert_eq!(message, "mount error(113): could not connect to 10.0.0.25")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.host.commands().len(), 1);
    }

    #[test]
    fn test_duplicate_mount_rejected_by_os() {
        let fx = fixture();
        let ops = ops(&fx);
        let token = Privileged::assume();

        ops.mount(&token, "Archives").unwrap();
        let err = ops.mount(&token, "Archives").unwrap_err();
        assert!(matches!(err, Error::MountFailed { .. }));
    }

    #[test]
    fn test_unmount_all_continues_past_busy_share() {
        let fx = fixture();
        let ops = ops(&fx);
        let token = Privileged::assume();

        for name in ["A", "B", "C"] {
            ops.mount(&token, name).unwrap();
        }
        fx.host.add_mount("/dev/sda1", "/", "ext4");
        fx.host.set_busy(&fx.config.mount_base.join("B"));

        let reports = ops.unmount_all(&token).unwrap();
        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[0].result, Ok(UnmountOutcome::Unmounted)));
        assert!(matches!(reports[1].result, Err(Error::UnmountFailed { .. })));
        assert!(matches!(reports[2].result, Ok(UnmountOutcome::Unmounted)));

        let remaining = ops.active_shares().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].target, fx.config.mount_base.join("B"));
        assert!(fx.host.is_mounted(Path::new("/")).unwrap());
    }

    #[test]
    fn test_unmount_through_symlinked_base() {
        let fx = fixture();
        let real = fx._dir.path().join("real");
        fs::create_dir_all(real.join("Archives")).unwrap();
        let link = fx._dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let resolved = fs::canonicalize(real.join("Archives")).unwrap();
        fx.host.add_mount("//10.0.0.25/Archives", resolved.clone(), "cifs");

        let config = ManagerConfig {
            mount_base: link,
            ..fx.config.clone()
        };
        let ops = ShareOps::new(&config, ServiceIdentity { uid: 0, gid: 0 }, &fx.host, &fx.host);

        let outcome = ops.unmount_share(&Privileged::assume(), "Archives").unwrap();
        assert_eq!(outcome, UnmountOutcome::Unmounted);
        assert!(!fx.host.is_mounted(&resolved).unwrap());
        assert_eq!(
            fx.host.commands()[0],
            vec!["umount".to_string(), "-f".to_string(), resolved.display().to_string()]
        );
    }
}

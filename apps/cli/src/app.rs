//! Operations as seen by the operator.
//!
//! Each method runs one core operation and prints one human-readable result.
//! Single-share failures are returned; batch operations report per item and
//! succeed as a whole.

use std::io::Write;
use std::path::Path;

use cifs_mount_core::executor::CommandRunner;
use cifs_mount_core::{
    AutomountConfigurator, AutomountOutcome, Confirm, CredentialPrompt, CredentialStore,
    ManagerConfig, MountInspector, Privileged, ServiceIdentity, ShareDiscovery, ShareOps,
    UnmountOutcome,
};

use crate::error::Result;

pub struct App<'a> {
    config: &'a ManagerConfig,
    token: Privileged,
    identity: ServiceIdentity,
    runner: &'a dyn CommandRunner,
    inspector: &'a dyn MountInspector,
}

impl<'a> App<'a> {
    pub fn new(
        config: &'a ManagerConfig,
        token: Privileged,
        identity: ServiceIdentity,
        runner: &'a dyn CommandRunner,
        inspector: &'a dyn MountInspector,
    ) -> Self {
        Self {
            config,
            token,
            identity,
            runner,
            inspector,
        }
    }

    fn ops(&self) -> ShareOps<'_> {
        ShareOps::new(self.config, self.identity, self.runner, self.inspector)
    }

    /// Creates the credential file on first use.
    pub fn ensure_credentials(
        &self,
        prompt: &mut dyn CredentialPrompt,
        out: &mut dyn Write,
    ) -> Result<()> {
        let store = CredentialStore::new(&self.config.credentials_file);
        if store.exists() {
            return Ok(());
        }
        writeln!(
            out,
            "No credentials found for {}; they will be stored in {}.",
            self.config.server,
            store.path().display()
        )?;
        store.ensure_credentials(prompt)?;
        writeln!(out, "Credentials saved.")?;
        Ok(())
    }

    pub fn list(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "Shares on {}:", self.config.server)?;
        ShareDiscovery::new(self.config, self.runner).list_shares(&self.token, out)?;
        Ok(())
    }

    pub fn mount(&self, name: &str, out: &mut dyn Write) -> Result<()> {
        let share = self.ops().mount(&self.token, name)?;
        writeln!(
            out,
            "Mounted {} at {}",
            share.remote_path(&self.config.server),
            share.mount_point.display()
        )?;
        Ok(())
    }

    /// Unmounts by absolute path, or by share name under the mount base.
    pub fn unmount(&self, target: &str, out: &mut dyn Write) -> Result<()> {
        let ops = self.ops();
        let mount_point = if Path::new(target).is_absolute() {
            Path::new(target).to_path_buf()
        } else {
            ops.share(target)?.mount_point
        };

        match ops.unmount(&self.token, &mount_point)? {
            UnmountOutcome::Unmounted => writeln!(out, "Unmounted {}", mount_point.display())?,
            UnmountOutcome::NotMounted => {
                writeln!(out, "{} is not mounted", mount_point.display())?
            }
        }
        Ok(())
    }

    pub fn unmount_all(&self, out: &mut dyn Write) -> Result<()> {
        let reports = self.ops().unmount_all(&self.token)?;
        if reports.is_empty() {
            writeln!(out, "No CIFS shares are mounted.")?;
            return Ok(());
        }

        let mut failed = 0;
        for report in &reports {
            match &report.result {
                Ok(_) => writeln!(out, "Unmounted {}", report.entry.target.display())?,
                Err(e) => {
                    failed += 1;
                    writeln!(out, "Error: {e}")?;
                }
            }
        }
        writeln!(
            out,
            "{} of {} shares unmounted.",
            reports.len() - failed,
            reports.len()
        )?;
        Ok(())
    }

    pub fn setup<S: AsRef<str>>(
        &self,
        shares: &[S],
        confirm: &mut dyn Confirm,
        out: &mut dyn Write,
    ) -> Result<()> {
        let outcome = AutomountConfigurator::new(self.config, self.runner).configure_automount(
            &self.token,
            shares,
            confirm,
        )?;

        match outcome {
            AutomountOutcome::Aborted { .. } => {
                writeln!(out, "Aborted; {} was not changed.", self.config.fstab_path.display())?;
            }
            AutomountOutcome::Configured {
                entries,
                replaced,
                skipped,
                backup,
                reload_error,
            } => {
                for skip in &skipped {
                    writeln!(out, "Skipped: {}", skip.error)?;
                }
                for entry in &entries {
                    writeln!(out, "Added: {}", entry.to_fstab_line())?;
                }
                writeln!(
                    out,
                    "Wrote {} entries to {} (replaced {}, backup at {}).",
                    entries.len(),
                    self.config.fstab_path.display(),
                    replaced.len(),
                    backup.display()
                )?;
                match reload_error {
                    Some(e) => writeln!(out, "Warning: {e}")?,
                    None => writeln!(out, "Run `mount -a -t cifs` to mount them now.")?,
                }
            }
        }
        Ok(())
    }

    /// Shows active CIFS mounts.
    pub fn show(&self, json: bool, out: &mut dyn Write) -> Result<()> {
        let mounts = self.ops().active_shares()?;
        if json {
            serde_json::to_writer_pretty(&mut *out, &mounts)?;
            writeln!(out)?;
            return Ok(());
        }

        if mounts.is_empty() {
            writeln!(out, "No CIFS shares are mounted.")?;
            return Ok(());
        }
        for entry in &mounts {
            writeln!(out, "{} on {}", entry.source, entry.target.display())?;
        }
        Ok(())
    }
}

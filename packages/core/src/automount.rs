//! Automount configuration.
//!
//! Rewrites fstab so a set of shares from the configured server mounts at
//! boot. Existing entries for the server are replaced as a whole, never
//! merged, and only after the caller confirms.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::{CIFS_FSTYPE, ManagerConfig, OwnerNames};
use crate::error::{Error, Result};
use crate::executor::CommandRunner;
use crate::fstab::{self, FstabEntry};
use crate::mount::Share;
use crate::options::CifsOptions;
use crate::privilege::Privileged;
use crate::systemd;

/// Asks whether existing entries for the server may be replaced.
pub trait Confirm {
    /// `existing` holds the fstab lines that would be removed.
    fn confirm_replace(&mut self, existing: &[String]) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&[String]) -> bool,
{
    fn confirm_replace(&mut self, existing: &[String]) -> bool {
        self(existing)
    }
}

/// A share name that was not written.
#[derive(Debug)]
pub struct SkippedShare {
    pub name: String,
    pub error: Error,
}

/// Result of a configuration run.
#[derive(Debug)]
pub enum AutomountOutcome {
    /// The table was rewritten.
    Configured {
        entries: Vec<FstabEntry>,
        /// Lines for the server that were removed.
        replaced: Vec<String>,
        skipped: Vec<SkippedShare>,
        backup: PathBuf,
        /// Set when `systemctl daemon-reload` failed after the write.
        reload_error: Option<Error>,
    },
    /// The user declined to replace existing entries; nothing changed.
    Aborted { existing: Vec<String> },
}

/// Builds the fstab entry for one share.
pub fn share_entry(config: &ManagerConfig, owner: &OwnerNames, share: &Share) -> FstabEntry {
    FstabEntry::new(
        share.remote_path(&config.server),
        share.mount_point.clone(),
        CIFS_FSTYPE,
        CifsOptions::for_fstab(config, owner.clone()).to_vec(),
        0,
        0,
    )
}

/// Rewrites fstab entries for the configured server.
pub struct AutomountConfigurator<'a> {
    config: &'a ManagerConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> AutomountConfigurator<'a> {
    pub fn new(config: &'a ManagerConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Replaces the server's fstab entries with one entry per share name.
    ///
    /// Duplicate names keep their first position; invalid names are reported
    /// in `skipped`. Nothing is written if no valid name remains or the
    /// confirmation is declined.
    pub fn configure_automount<S: AsRef<str>>(
        &self,
        _token: &Privileged,
        share_names: &[S],
        confirm: &mut dyn Confirm,
    ) -> Result<AutomountOutcome> {
        let (shares, skipped) = self.collect_shares(share_names);
        if shares.is_empty() {
            return Err(Error::NoShares);
        }
        let owner = OwnerNames::resolve(self.config)?;

        let path = &self.config.fstab_path;
        let content = fstab::read_fstab(path)?;

        let existing = fstab::server_entry_lines(&content, &self.config.server);
        if !existing.is_empty() && !confirm.confirm_replace(&existing) {
            info!(server = %self.config.server, "automount configuration declined");
            return Ok(AutomountOutcome::Aborted { existing });
        }

        let entries: Vec<FstabEntry> = shares
            .iter()
            .map(|share| share_entry(self.config, &owner, share))
            .collect();
        let updated = fstab::replace_server_entries(&content, &self.config.server, &entries);

        // The backup lands next to the table; if it cannot be written, neither can the table.
        let backup = fstab::backup_fstab(path).map_err(|e| match e {
            Error::Backup { source, .. } => Error::Persist {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        fstab::write_fstab(path, &updated)?;
        info!(
            fstab = %path.display(),
            entries = entries.len(),
            replaced = existing.len(),
            "wrote automount entries"
        );

        let reload_error = systemd::daemon_reload(self.runner).err();
        if let Some(e) = &reload_error {
            warn!(error = %e, "daemon-reload failed after fstab update");
        }

        Ok(AutomountOutcome::Configured {
            entries,
            replaced: existing,
            skipped,
            backup,
            reload_error,
        })
    }

    fn collect_shares<S: AsRef<str>>(&self, names: &[S]) -> (Vec<Share>, Vec<SkippedShare>) {
        let mut shares: Vec<Share> = Vec::with_capacity(names.len());
        let mut skipped = Vec::new();

        for name in names.iter().map(AsRef::as_ref) {
            if shares.iter().any(|s| s.name == name) {
                continue;
            }
            match Share::new(&self.config.mount_base, name) {
                Ok(share) => shares.push(share),
                Err(error) => {
                    warn!(share = name, error = %error, "skipping share");
                    skipped.push(SkippedShare {
                        name: name.to_string(),
                        error,
                    });
                }
            }
        }

        (shares, skipped)
    }
}

//! Live mount table inspection.
//!
//! [`MountInspector`] is the only way the manager learns what is mounted.
//! [`ProcMountTable`] reads `/proc/mounts`; [`crate::fake::FakeHost`] keeps an
//! in-memory table for tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use snafu::ResultExt;

use crate::error::{MountTableReadSnafu, Result};
use crate::fstab::unescape_fstab_path;

/// One line of the live mount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountEntry {
    /// Mounted source, e.g. `//10.0.0.25/Archives`.
    pub source: String,
    /// Mount target.
    pub target: PathBuf,
    pub fs_type: String,
    pub options: Vec<String>,
}

impl MountEntry {
    /// Parses a `/proc/mounts` line. Malformed lines yield `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let source = fields.next()?;
        let target = fields.next()?;
        let fs_type = fields.next()?;
        let options = fields.next()?;

        Some(Self {
            source: unescape_fstab_path(source),
            target: PathBuf::from(unescape_fstab_path(target)),
            fs_type: fs_type.to_string(),
            options: options.split(',').map(|s| s.to_string()).collect(),
        })
    }
}

/// Parses the whole text of a mount table, skipping malformed lines.
pub fn parse_mount_table(content: &str) -> Vec<MountEntry> {
    content.lines().filter_map(MountEntry::from_line).collect()
}

/// Read access to the live mount table.
pub trait MountInspector {
    /// All active mounts in table order.
    fn active_mounts(&self) -> Result<Vec<MountEntry>>;

    /// Returns true if some active mount targets `mount_point`.
    fn is_mounted(&self, mount_point: &Path) -> Result<bool> {
        Ok(self
            .active_mounts()?
            .iter()
            .any(|entry| entry.target == mount_point))
    }

    /// Active mounts of one filesystem type, in table order.
    fn mounts_of_type(&self, fs_type: &str) -> Result<Vec<MountEntry>> {
        Ok(self
            .active_mounts()?
            .into_iter()
            .filter(|entry| entry.fs_type == fs_type)
            .collect())
    }
}

/// Mount table backed by a procfs file.
#[derive(Debug, Clone)]
pub struct ProcMountTable {
    path: PathBuf,
}

impl ProcMountTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcMountTable {
    fn default() -> Self {
        Self::new("/proc/mounts")
    }
}

impl MountInspector for ProcMountTable {
    fn active_mounts(&self) -> Result<Vec<MountEntry>> {
        let content = fs::read_to_string(&self.path).context(MountTableReadSnafu {
            path: self.path.clone(),
        })?;
        Ok(parse_mount_table(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    const SAMPLE: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
//10.0.0.25/Archives /mnt/Archives cifs rw,relatime,vers=2.0,uid=33,gid=33 0 0
//10.0.0.25/My\\040Share /mnt/My\\040Share cifs rw,vers=2.0 0 0
garbage
";

    #[test]
    fn test_parse_skips_malformed_lines() {
        let entries = parse_mount_table(SAMPLE);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[3].source, "//10.0.0.25/Archives");
        assert_eq!(entries[4].target, PathBuf::from("/mnt/My Share"));
    }

    #[test]
    fn test_proc_table_is_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mounts");
        fs::write(&path, SAMPLE).unwrap();
        let table = ProcMountTable::new(&path);

        assert!(table.is_mounted(Path::new("/mnt/Archives")).unwrap());
        assert!(table.is_mounted(Path::new("/mnt/Archives/")).unwrap());
        assert!(table.is_mounted(Path::new("/mnt/My Share")).unwrap());
        assert!(!table.is_mounted(Path::new("/mnt/Archive")).unwrap());
        assert_eq!(table.mounts_of_type("cifs").unwrap().len(), 2);
    }

    #[test]
    fn test_large_table() {
        let mut content = String::new();
        for i in 0..5000 {
            writeln!(content, "overlay /var/lib/containers/{i} overlay rw 0 0").unwrap();
        }
        writeln!(content, "//files/Scans /srv/Scans cifs rw 0 0").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mounts");
        fs::write(&path, content).unwrap();
        let table = ProcMountTable::new(&path);

        assert!(table.is_mounted(Path::new("/srv/Scans")).unwrap());
        assert_eq!(table.mounts_of_type("cifs").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_table_errors() {
        let table = ProcMountTable::new("/nonexistent/mounts");
        assert!(table.active_mounts().is_err());
    }
}

//! Fstab parsing and writing module.
//!
//! Entries owned by this tool are identified by their source: every line whose
//! first field is `//<server>/...` belongs to the configured server and is
//! replaced wholesale when automount is configured. All other lines are kept
//! byte for byte.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoResultExt, Result};

/// Represents a single fstab entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabEntry {
    /// The remote path or device identifier (e.g., "//10.0.0.25/Archives").
    pub fs_spec: String,
    /// Mount point path.
    pub mount_point: PathBuf,
    /// Filesystem type (e.g., "cifs").
    pub vfs_type: String,
    /// Mount options.
    pub mount_options: Vec<String>,
    /// This field is used by dump(8) to determine which filesystems need to be dumped.
    pub dump: u8,
    /// This field is used by fsck(8) to determine the order in which filesystem checks are done at boot time.
    pub fsck_order: u16,
}

impl FstabEntry {
    /// Creates a new fstab entry.
    pub fn new(
        fs_spec: impl Into<String>,
        mount_point: impl Into<PathBuf>,
        fs_type: impl Into<String>,
        mount_options: Vec<String>,
        dump: u8,
        fsck_order: u16,
    ) -> Self {
        Self {
            fs_spec: fs_spec.into(),
            mount_point: mount_point.into(),
            vfs_type: fs_type.into(),
            mount_options,
            dump,
            fsck_order,
        }
    }

    /// Formats the entry as an fstab line.
    pub fn to_fstab_line(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            escape_fstab_path(&self.fs_spec),
            escape_fstab_path(&self.mount_point.to_string_lossy()),
            self.vfs_type,
            self.mount_options.join(","),
            self.dump,
            self.fsck_order
        )
    }
}

/// Returns true if an fstab source like `//host/share` points at `server`.
///
/// Host names compare case-insensitively. Backslash separators are accepted
/// as well since some hand-written tables use UNC style.
pub fn spec_references_server(fs_spec: &str, server: &str) -> bool {
    let normalized = fs_spec.replace('\\', "/");
    let Some(rest) = normalized.strip_prefix("//") else {
        return false;
    };
    let host = rest.split('/').next().unwrap_or_default();
    !host.is_empty() && host.eq_ignore_ascii_case(server.trim())
}

/// Returns true if a raw fstab line is an entry whose source is on `server`.
pub fn line_references_server(line: &str, server: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return false;
    }
    trimmed
        .split_whitespace()
        .next()
        .map(|spec| spec_references_server(&unescape_fstab_path(spec), server))
        .unwrap_or(false)
}

/// Escapes special characters in fstab paths using octal sequences.
///
/// Handles space (\040), tab (\011), newline (\012), and backslash (\134).
pub(crate) fn escape_fstab_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            ' ' => encoded.push_str(r"\040"),
            '\t' => encoded.push_str(r"\011"),
            '\n' => encoded.push_str(r"\012"),
            '\\' => encoded.push_str(r"\134"),
            _ => encoded.push(c),
        }
    }
    encoded
}

/// Unescapes octal sequences in fstab and `/proc/mounts` paths.
pub(crate) fn unescape_fstab_path(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            // Look ahead for exactly three octal digits
            let octal_digits: String = chars
                .clone()
                .take(3)
                .take_while(|d| ('0'..='7').contains(d))
                .collect();

            if octal_digits.len() == 3
                && let Ok(byte) = u8::from_str_radix(&octal_digits, 8)
            {
                result.push(byte as char);
                for _ in 0..3 {
                    chars.next();
                }
                continue;
            }
        }
        result.push(c);
    }
    result
}

/// Reads the fstab file as text.
pub fn read_fstab(path: &Path) -> Result<String> {
    fs::read_to_string(path).fstab_read_context(path)
}

/// Lines of `content` that are entries for `server`, in file order.
pub fn server_entry_lines(content: &str, server: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| line_references_server(line, server))
        .map(|line| line.to_string())
        .collect()
}

/// Replaces every entry for `server` with `entries`.
///
/// Unrelated lines keep their position and text; the new entries are appended
/// at the end in the order given. Running it again with the same entries
/// produces the same output.
pub fn replace_server_entries(content: &str, server: &str, entries: &[FstabEntry]) -> String {
    let mut output = String::with_capacity(content.len() + entries.len() * 128);

    for line in content.lines() {
        if line_references_server(line, server) {
            continue;
        }
        output.push_str(line);
        output.push('\n');
    }

    for entry in entries {
        output.push_str(&entry.to_fstab_line());
        output.push('\n');
    }

    output
}

/// Creates a timestamped backup of the fstab file.
///
/// Returns the path to the backup file.
pub fn backup_fstab(path: &Path) -> Result<PathBuf> {
    let timestamp = chrono_lite_timestamp();
    let backup_name = format!("{}.backup.{}", path.display(), timestamp);
    let backup_path = PathBuf::from(&backup_name);

    fs::copy(path, &backup_path).backup_context(&backup_path)?;

    Ok(backup_path)
}

/// Simple timestamp without external dependencies.
fn chrono_lite_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}

/// Writes the fstab content back to disk.
pub fn write_fstab(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).persist_context(path)
}

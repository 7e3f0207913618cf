//! Unified error types for the cifs-mount-core library.
//!
//! Uses SNAFU for context-rich error handling, especially useful when the same
//! underlying error type (like `std::io::Error`) appears in different contexts.
//! Messages coming from OS utilities are carried verbatim so the operator sees
//! the raw diagnostic.

use snafu::{ResultExt, Snafu};
use std::path::PathBuf;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all core library operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The process is not running with administrative privileges.
    #[snafu(display("this tool must run as root (effective uid is {euid})"))]
    NotPrivileged { euid: u32 },

    /// Failed to execute a system command.
    #[snafu(display("failed to execute command '{command}'"))]
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

    /// The credential file does not exist.
    #[snafu(display(
        "credential file {} does not exist; run an interactive command to create it",
        path.display()
    ))]
    MissingCredentials { path: PathBuf },

    /// The credential file exists but could not be read.
    #[snafu(display("failed to read credential file {}", path.display()))]
    CredentialsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The credential file could not be created or its mode could not be set.
    #[snafu(display("failed to write credential file {}", path.display()))]
    CredentialsWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Mount point creation failed.
    #[snafu(display("failed to create mount point at {}", path.display()))]
    MountPointCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The OS mount utility refused to mount the share.
    #[snafu(display("failed to mount {remote} at {}: {message}", path.display()))]
    MountFailed {
        remote: String,
        path: PathBuf,
        message: String,
    },

    /// The OS unmount utility refused to detach the mount point.
    #[snafu(display("failed to unmount {}: {message}", path.display()))]
    UnmountFailed { path: PathBuf, message: String },

    /// The live mount table could not be read.
    #[snafu(display("failed to read mount table at {}", path.display()))]
    MountTableRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The share enumeration utility is not available, even after install.
    #[snafu(display("share discovery unavailable: '{tool}' is not installed"))]
    DiscoveryUnavailable { tool: String },

    /// Fstab file not found or cannot be read.
    #[snafu(display("failed to read fstab at {}", path.display()))]
    FstabRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to persist the fstab file.
    #[snafu(display("failed to persist mount table at {}", path.display()))]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create backup.
    #[snafu(display("failed to create backup at {}", path.display()))]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A share name cannot be used as a directory under the mount base.
    #[snafu(display("invalid share name '{name}': {reason}"))]
    InvalidShareName { name: String, reason: String },

    /// No usable share names were supplied.
    #[snafu(display("at least one valid share name is required"))]
    NoShares,

    /// The configured service user does not exist.
    #[snafu(display("unknown service user '{name}'"))]
    UnknownUser { name: String },

    /// The configured service group does not exist.
    #[snafu(display("unknown service group '{name}'"))]
    UnknownGroup { name: String },

    /// Failed to read the configuration file.
    #[snafu(display("failed to read config at {}", path.display()))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[snafu(display("failed to parse config at {}: {source}", path.display()))]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The configuration is syntactically valid but unusable.
    #[snafu(display("invalid configuration: {message}"))]
    InvalidConfig { message: String },

    /// Systemd operation failed.
    #[snafu(display("systemd operation failed: {message}"))]
    Systemd { message: String },
}

/// Extension trait for adding context to io::Error results.
pub trait IoResultExt<T> {
    /// Add context for command execution errors.
    fn command_context(self, command: impl Into<String>) -> Result<T>;

    /// Add context for fstab read errors.
    fn fstab_read_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for fstab write errors.
    fn persist_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for backup errors.
    fn backup_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for mount point creation errors.
    fn mount_point_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for credential file write errors.
    fn credentials_write_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn command_context(self, command: impl Into<String>) -> Result<T> {
        self.context(CommandExecutionSnafu {
            command: command.into(),
        })
    }

    fn fstab_read_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(FstabReadSnafu { path: path.into() })
    }

    fn persist_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(PersistSnafu { path: path.into() })
    }

    fn backup_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(BackupSnafu { path: path.into() })
    }

    fn mount_point_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(MountPointCreationSnafu { path: path.into() })
    }

    fn credentials_write_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(CredentialsWriteSnafu { path: path.into() })
    }
}

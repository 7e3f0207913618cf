//! cifs-mount-core: Core library for managing CIFS/SMB share mounts.
//!
//! This library mounts and unmounts the shares of one file server under a
//! common base directory, lists the shares the server advertises, and writes
//! fstab entries so the shares mount at boot.
//!
//! # Modules
//!
//! - [`config`]: Configuration file and service identity
//! - [`credentials`]: Owner-only credential file
//! - [`mount_table`]: Live mount table inspection
//! - [`mount`]: Mount/unmount operations
//! - [`options`]: CIFS mount options
//! - [`discovery`]: Share enumeration
//! - [`automount`]: Fstab configuration for boot-time mounts
//! - [`fstab`]: Fstab parsing and writing
//! - [`systemd`]: Systemd control (daemon-reload)
//! - [`executor`]: Command execution
//! - [`privilege`]: Root capability token
//! - [`fake`]: In-memory host for tests
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use cifs_mount_core::{ManagerConfig, Privileged, ServiceIdentity, ShareOps};
//! use cifs_mount_core::executor::SystemRunner;
//! use cifs_mount_core::mount_table::ProcMountTable;
//!
//! let token = Privileged::acquire().unwrap();
//! let config = ManagerConfig {
//!     server: "10.0.0.25".to_string(),
//!     ..Default::default()
//! };
//! let identity = ServiceIdentity::resolve(&config).unwrap();
//! let runner = SystemRunner::new();
//! let table = ProcMountTable::new(&config.mount_table);
//!
//! let ops = ShareOps::new(&config, identity, &runner, &table);
//! let share = ops.mount(&token, "Archives").unwrap();
//! ops.unmount(&token, &share.mount_point).unwrap();
//! ```

pub mod automount;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod fake;
pub mod fstab;
pub mod mount;
pub mod mount_table;
pub mod options;
pub mod privilege;
pub mod systemd;

// Re-export commonly used types
pub use automount::{AutomountConfigurator, AutomountOutcome, Confirm};
pub use config::{ManagerConfig, OwnerNames, ServiceIdentity};
pub use credentials::{CredentialPrompt, CredentialRecord, CredentialStore};
pub use discovery::ShareDiscovery;
pub use error::{Error, Result};
pub use fstab::FstabEntry;
pub use mount::{Share, ShareOps, UnmountOutcome, UnmountReport};
pub use mount_table::{MountEntry, MountInspector};
pub use privilege::Privileged;

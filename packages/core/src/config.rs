//! Manager configuration.
//!
//! Loaded from a TOML file; every field has a default so a missing file is
//! valid as long as a server address is supplied some other way.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use nix::unistd::{Group, User};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::debug;

use crate::error::{ConfigParseSnafu, ConfigReadSnafu, Error, Result};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cifs-mount/config.toml";

/// Filesystem type managed by this tool.
pub const CIFS_FSTYPE: &str = "cifs";

/// Settings for share enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Enumeration utility invoked as `<tool> -L //<server> -A <credentials>`.
    pub tool: String,
    /// Command run once when the tool is missing.
    pub install_command: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            tool: "smbclient".to_string(),
            install_command: ["apt-get", "install", "-y", "smbclient"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Address of the file server (host name or IP).
    pub server: String,
    /// Directory under which each share gets its own mount point.
    pub mount_base: PathBuf,
    /// Location of the credential file.
    pub credentials_file: PathBuf,
    /// Persistent mount table.
    pub fstab_path: PathBuf,
    /// Live mount table.
    pub mount_table: PathBuf,
    /// Account that should own the mounted files.
    pub service_user: String,
    /// Group that should own the mounted files; the user's primary group when unset.
    pub service_group: Option<String>,
    /// SMB protocol version passed as `vers=`.
    pub smb_version: String,
    /// Character set passed as `iocharset=`.
    pub iocharset: String,
    pub discovery: DiscoveryConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            mount_base: PathBuf::from("/mnt"),
            credentials_file: PathBuf::from("/root/.smbcredentials"),
            fstab_path: PathBuf::from("/etc/fstab"),
            mount_table: PathBuf::from("/proc/mounts"),
            service_user: "root".to_string(),
            service_group: None,
            smb_version: "2.0".to_string(),
            iocharset: "utf8".to_string(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Loads the configuration, falling back to defaults if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e).context(ConfigReadSnafu { path }),
        };

        Self::from_toml(&content, path)
    }

    /// Parses configuration from TOML text. `origin` is only used in errors.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).context(ConfigParseSnafu { path: origin })
    }

    /// Checks the fields every operation depends on.
    pub fn validate(&self) -> Result<()> {
        let server = self.server.trim();
        if server.is_empty() {
            return Err(Error::InvalidConfig {
                message: "no server configured; set `server` or pass --server".to_string(),
            });
        }
        if server.contains('/') || server.chars().any(char::is_whitespace) {
            return Err(Error::InvalidConfig {
                message: format!("server '{}' must be a bare host name or address", self.server),
            });
        }
        let credentials = self.credentials_file.to_string_lossy();
        if credentials.contains(',') || credentials.chars().any(char::is_whitespace) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "credentials_file {} cannot appear in a mount option list; avoid commas and whitespace",
                    self.credentials_file.display()
                ),
            });
        }
        if !self.mount_base.is_absolute() {
            return Err(Error::InvalidConfig {
                message: format!(
                    "mount_base {} must be an absolute path",
                    self.mount_base.display()
                ),
            });
        }
        Ok(())
    }

}

/// Numeric owner and group for mounted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl ServiceIdentity {
    /// Resolves the configured user and group through the system databases.
    pub fn resolve(config: &ManagerConfig) -> Result<Self> {
        let user = lookup_user(&config.service_user)?;
        let gid = match &config.service_group {
            Some(name) => lookup_group(name)?.gid,
            None => user.gid,
        };

        Ok(Self {
            uid: user.uid.as_raw(),
            gid: gid.as_raw(),
        })
    }
}

/// Owner and group names written to fstab entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerNames {
    pub user: String,
    pub group: String,
}

impl OwnerNames {
    /// Resolves the names matching [`ServiceIdentity::resolve`].
    ///
    /// Without a configured group the user's primary group is looked up by gid,
    /// since its name need not match the user name.
    pub fn resolve(config: &ManagerConfig) -> Result<Self> {
        let user = lookup_user(&config.service_user)?;
        let group = match &config.service_group {
            Some(name) => lookup_group(name)?.name,
            None => Group::from_gid(user.gid)
                .ok()
                .flatten()
                .ok_or_else(|| Error::UnknownGroup {
                    name: user.gid.to_string(),
                })?
                .name,
        };

        Ok(Self {
            user: user.name,
            group,
        })
    }
}

fn lookup_user(name: &str) -> Result<User> {
    User::from_name(name)
        .ok()
        .flatten()
        .ok_or_else(|| Error::UnknownUser {
            name: name.to_string(),
        })
}

fn lookup_group(name: &str) -> Result<Group> {
    Group::from_name(name)
        .ok()
        .flatten()
        .ok_or_else(|| Error::UnknownGroup {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.mount_base, PathBuf::from("/mnt"));
        assert_eq!(config.smb_version, "2.0");
        assert_eq!(config.iocharset, "utf8");
        assert_eq!(config.discovery.tool, "smbclient");
        assert_eq!(config.service_group, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ManagerConfig::from_toml(
            r#"
server = "10.0.0.25"
mount_base = "/srv/shares"
service_user = "app"
service_group = "media"

[discovery]
install_command = ["dnf", "install", "-y", "samba-client"]
"#,
            Path::new("test.toml"),
        )
        .unwrap();

        assert_eq!(config.server, "10.0.0.25");
        assert_eq!(config.mount_base, PathBuf::from("/srv/shares"));
        assert_eq!(config.service_group.as_deref(), Some("media"));
        assert_eq!(config.discovery.tool, "smbclient");
        assert_eq!(config.discovery.install_command[0], "dnf");
        assert_eq!(config.fstab_path, PathBuf::from("/etc/fstab"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ManagerConfig::from_toml("sever = \"typo\"", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn test_validate() {
        let mut config = ManagerConfig::default();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));

        config.server = "//10.0.0.25".to_string();
        assert!(config.validate().is_err());

        config.server = "10.0.0.25".to_string();
        assert!(config.validate().is_ok());

        config.mount_base = PathBuf::from("relative");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_credentials_path_fits_option_list() {
        let mut config = ManagerConfig {
            server: "10.0.0.25".to_string(),
            ..Default::default()
        };
        for bad in ["/root/my creds", "/root/a,b", "/root/tab\tcreds"] {
            config.credentials_file = PathBuf::from(bad);
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig { .. })),
                "accepted {bad}"
            );
        }
        config.credentials_file = PathBuf::from("/etc/cifs-mount/credentials");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_root_identity() {
        let config = ManagerConfig::default();
        let identity = ServiceIdentity::resolve(&config).unwrap();
        assert_eq!(identity, ServiceIdentity { uid: 0, gid: 0 });
    }

    #[test]
    fn test_owner_names_default_to_root() {
        let names = OwnerNames::resolve(&ManagerConfig::default()).unwrap();
        assert_eq!(names.user, "root");
        assert_eq!(names.group, "root");
    }

    #[test]
    fn test_owner_group_is_primary_group_name() {
        // `sync` on Debian has primary group `nogroup`.
        let user = ["sync", "nobody", "daemon", "bin"]
            .into_iter()
            .filter_map(|name| User::from_name(name).ok().flatten())
            .find(|u| {
                Group::from_gid(u.gid)
                    .ok()
                    .flatten()
                    .is_some_and(|g| g.name != u.name)
            })
            .or_else(|| User::from_name("root").ok().flatten())
            .unwrap();
        let config = ManagerConfig {
            service_user: user.name.clone(),
            ..Default::default()
        };

        let names = OwnerNames::resolve(&config).unwrap();
        let identity = ServiceIdentity::resolve(&config).unwrap();
        let group = Group::from_name(&names.group).unwrap().unwrap();
        assert_eq!(group.gid.as_raw(), identity.gid);
        assert_eq!(names.user, user.name);
    }

    #[test]
    fn test_owner_names_explicit_group() {
        let config = ManagerConfig {
            service_group: Some("root".to_string()),
            ..Default::default()
        };
        assert_eq!(OwnerNames::resolve(&config).unwrap().group, "root");

        let config = ManagerConfig {
            service_group: Some("no-such-group-cifs-mount".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            OwnerNames::resolve(&config),
            Err(Error::UnknownGroup { .. })
        ));
    }

    #[test]
    fn test_resolve_unknown_user() {
        let config = ManagerConfig {
            service_user: "no-such-user-cifs-mount".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ServiceIdentity::resolve(&config),
            Err(Error::UnknownUser { .. })
        ));
    }
}

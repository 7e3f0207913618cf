//! CIFS mount option generation.
//!
//! The live mount and the fstab entry carry the same option set. They differ
//! only in how ownership is written: numeric ids for `mount -o`, account names
//! for fstab so the table stays readable.

use std::path::Path;

use crate::config::{ManagerConfig, OwnerNames, ServiceIdentity};

/// Owner/group rendering for the `uid=` and `gid=` options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Numeric(ServiceIdentity),
    Named(OwnerNames),
}

/// Options passed to `mount.cifs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CifsOptions {
    pub credentials_file: String,
    pub iocharset: String,
    pub version: String,
    pub ownership: Ownership,
}

impl CifsOptions {
    /// Options for an immediate mount.
    pub fn for_mount(config: &ManagerConfig, identity: ServiceIdentity) -> Self {
        Self::with_ownership(config, Ownership::Numeric(identity))
    }

    /// Options for a persistent fstab entry.
    pub fn for_fstab(config: &ManagerConfig, owner: OwnerNames) -> Self {
        Self::with_ownership(config, Ownership::Named(owner))
    }

    fn with_ownership(config: &ManagerConfig, ownership: Ownership) -> Self {
        Self {
            credentials_file: path_option(&config.credentials_file),
            iocharset: config.iocharset.clone(),
            version: config.smb_version.clone(),
            ownership,
        }
    }

    /// Options in fixed order.
    pub fn to_vec(&self) -> Vec<String> {
        let (uid, gid) = match &self.ownership {
            Ownership::Numeric(identity) => (identity.uid.to_string(), identity.gid.to_string()),
            Ownership::Named(owner) => (owner.user.clone(), owner.group.clone()),
        };

        vec![
            format!("credentials={}", self.credentials_file),
            format!("iocharset={}", self.iocharset),
            format!("vers={}", self.version),
            format!("uid={uid}"),
            format!("gid={gid}"),
        ]
    }

    /// Comma-separated form for `mount -o`.
    pub fn to_option_string(&self) -> String {
        self.to_vec().join(",")
    }
}

fn path_option(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ManagerConfig {
        ManagerConfig {
            server: "10.0.0.25".to_string(),
            service_user: "app".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_mount_options_use_numeric_ids() {
        let options = CifsOptions::for_mount(&config(), ServiceIdentity { uid: 33, gid: 44 });
        assert_eq!(
            options.to_option_string(),
            "credentials=/root/.smbcredentials,iocharset=utf8,vers=2.0,uid=33,gid=44"
        );
    }

    #[test]
    fn test_fstab_options_use_names() {
        let owner = OwnerNames {
            user: "sync".to_string(),
            group: "nogroup".to_string(),
        };
        let options = CifsOptions::for_fstab(&config(), owner);
        assert_eq!(
            options.to_vec(),
            vec![
                "credentials=/root/.smbcredentials",
                "iocharset=utf8",
                "vers=2.0",
                "uid=sync",
                "gid=nogroup",
            ]
        );
    }
}

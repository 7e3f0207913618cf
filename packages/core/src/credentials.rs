//! Credential store for the file server account.
//!
//! The record lives in a single `key=value` file with mode `0600`, which is
//! the same format `mount.cifs credentials=` and `smbclient -A` read. The file
//! text is only produced and consumed by [`CredentialRecord::to_file_contents`]
//! and [`CredentialRecord::parse`].

use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::error::{Error, IoResultExt, Result};

/// Owner read/write only.
pub const CREDENTIALS_MODE: u32 = 0o600;

/// The account used to reach the file server.
#[derive(Debug)]
pub struct CredentialRecord {
    pub username: String,
    pub password: SecretString,
    pub domain: Option<String>,
}

/// Fields that can be read individually from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Username,
    Password,
    Domain,
}

impl CredentialRecord {
    /// Renders the record in the credential file format.
    pub fn to_file_contents(&self) -> String {
        let mut out = format!(
            "username={}\npassword={}\n",
            self.username,
            self.password.expose_secret()
        );
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            out.push_str("domain=");
            out.push_str(domain);
            out.push('\n');
        }
        out
    }

    /// Parses the credential file format.
    ///
    /// Blank lines, `#` comments and unknown keys are ignored. Missing fields
    /// read as empty.
    pub fn parse(content: &str) -> Self {
        let mut username = String::new();
        let mut password = String::new();
        let mut domain = None;

        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "username" | "user" => username = value.to_string(),
                "password" | "pass" => password = value.to_string(),
                "domain" => domain = Some(value.to_string()).filter(|d| !d.is_empty()),
                _ => {}
            }
        }

        Self {
            username,
            password: SecretString::from(password),
            domain,
        }
    }

    /// Returns the value of one field, empty when absent.
    pub fn field(&self, field: CredentialField) -> String {
        match field {
            CredentialField::Username => self.username.clone(),
            CredentialField::Password => self.password.expose_secret().to_string(),
            CredentialField::Domain => self.domain.clone().unwrap_or_default(),
        }
    }
}

/// Source of credential values when the file has to be created.
pub trait CredentialPrompt {
    fn username(&mut self) -> io::Result<String>;

    /// Must not echo the typed value.
    fn password(&mut self) -> io::Result<SecretString>;

    /// An empty answer means no domain.
    fn domain(&mut self) -> io::Result<Option<String>>;
}

/// Handle on the credential file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Creates the credential file from prompted values if it does not exist.
    ///
    /// Returns true if a file was written.
    pub fn ensure_credentials(&self, prompt: &mut dyn CredentialPrompt) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }

        let username = prompt
            .username()
            .credentials_write_context(&self.path)?
            .trim()
            .to_string();
        let password = prompt.password().credentials_write_context(&self.path)?;
        let domain = prompt
            .domain()
            .credentials_write_context(&self.path)?
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let record = CredentialRecord {
            username,
            password,
            domain,
        };
        self.write(&record)?;
        info!(path = %self.path.display(), "created credential file");
        Ok(true)
    }

    /// Writes the record, replacing any existing file, with owner-only access.
    pub fn write(&self, record: &CredentialRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).credentials_write_context(&self.path)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(CREDENTIALS_MODE)
            .open(&self.path)
            .credentials_write_context(&self.path)?;

        // The mode passed to open is masked by umask and ignored for existing files.
        fs::set_permissions(&self.path, Permissions::from_mode(CREDENTIALS_MODE))
            .credentials_write_context(&self.path)?;

        file.write_all(record.to_file_contents().as_bytes())
            .credentials_write_context(&self.path)?;
        file.sync_all().credentials_write_context(&self.path)?;
        Ok(())
    }

    /// Reads the full record.
    pub fn load(&self) -> Result<CredentialRecord> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(CredentialRecord::parse(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::MissingCredentials {
                path: self.path.clone(),
            }),
            Err(e) => Err(Error::CredentialsRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Reads a single field, empty when the field is absent.
    pub fn read_credential(&self, field: CredentialField) -> Result<String> {
        Ok(self.load()?.field(field))
    }

    /// Fails with [`Error::MissingCredentials`] unless the file exists.
    pub fn require(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(Error::MissingCredentials {
                path: self.path.clone(),
            })
        }
    }
}

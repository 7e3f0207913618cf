//! Administrative privilege capability.
//!
//! Operations that touch mounts or system files take a [`Privileged`] token.
//! The token is obtained once at startup, so the root check happens in one
//! place and tests can build one without real elevation.

use nix::unistd::geteuid;

use crate::error::{Error, Result};

/// Proof that the process runs with root privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Privileged {
    _private: (),
}

impl Privileged {
    /// Checks the effective UID and returns a token if it is root.
    pub fn acquire() -> Result<Self> {
        let euid = geteuid();
        if !euid.is_root() {
            return Err(Error::NotPrivileged {
                euid: euid.as_raw(),
            });
        }
        Ok(Self { _private: () })
    }

    /// Builds a token without checking.
    ///
    /// Intended for tests that drive operations against a fake host.
    pub fn assume() -> Self {
        Self { _private: () }
    }
}

//! Systemd control module.
//!
//! After fstab changes systemd has to regenerate its mount units. Reloading
//! does not mount anything by itself.

use crate::error::{Error, Result};
use crate::executor::CommandRunner;

/// Reloads the systemd daemon to pick up configuration changes.
///
/// This is equivalent to running `systemctl daemon-reload`.
pub fn daemon_reload(runner: &dyn CommandRunner) -> Result<()> {
    run_systemctl(runner, &["daemon-reload"])
}

/// Helper function to run systemctl commands.
fn run_systemctl(runner: &dyn CommandRunner, args: &[&str]) -> Result<()> {
    let output = runner.run("systemctl", args)?;

    if !output.success() {
        return Err(Error::Systemd {
            message: output.diagnostic(),
        });
    }

    Ok(())
}

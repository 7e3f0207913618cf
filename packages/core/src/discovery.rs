//! Share discovery.
//!
//! Asks the server for its share list with the enumeration tool and hands the
//! raw listing to the caller unparsed.

use std::io::Write;

use tracing::{info, warn};

use crate::config::ManagerConfig;
use crate::credentials::CredentialStore;
use crate::error::{Error, IoResultExt, Result};
use crate::executor::CommandRunner;
use crate::privilege::Privileged;

/// Lists the shares a server advertises.
pub struct ShareDiscovery<'a> {
    config: &'a ManagerConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> ShareDiscovery<'a> {
    pub fn new(config: &'a ManagerConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Writes the server's share listing to `out`.
    ///
    /// Installs the enumeration tool once if it is missing.
    pub fn list_shares(&self, token: &Privileged, out: &mut dyn Write) -> Result<()> {
        CredentialStore::new(&self.config.credentials_file).require()?;
        self.ensure_tool(token)?;

        let tool = self.config.discovery.tool.as_str();
        let remote = format!("//{}", self.config.server);
        let credentials = self.config.credentials_file.to_string_lossy().to_string();

        let output = self.runner.run_checked(
            tool,
            &["-L", remote.as_str(), "-A", credentials.as_str()],
        )?;

        out.write_all(output.stdout.as_bytes())
            .and_then(|()| out.flush())
            .command_context(tool)?;
        Ok(())
    }

    fn ensure_tool(&self, _token: &Privileged) -> Result<()> {
        let tool = &self.config.discovery.tool;
        if self.runner.has_program(tool) {
            return Ok(());
        }

        let Some((program, args)) = self.config.discovery.install_command.split_first() else {
            return Err(Error::DiscoveryUnavailable { tool: tool.clone() });
        };

        info!(%tool, installer = %program, "share enumeration tool missing, installing");
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if let Err(e) = self.runner.run_checked(program, &args) {
            warn!(error = %e, "install command failed");
        }

        if self.runner.has_program(tool) {
            Ok(())
        } else {
            Err(Error::DiscoveryUnavailable { tool: tool.clone() })
        }
    }
}

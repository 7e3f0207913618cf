//! Command execution abstraction.
//!
//! Every interaction with OS utilities (`mount`, `umount`, `smbclient`,
//! `systemctl`) goes through [`CommandRunner`], so the share operations can be
//! driven against [`crate::fake::FakeHost`] in tests.

use std::process::Command;

use tracing::debug;

use crate::error::{Error, IoResultExt, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true if the command exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The message an operator should see for a failed command.
    ///
    /// Prefers stderr, falls back to stdout since `mount.cifs` reports some
    /// errors there.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exited with code {}", self.code.unwrap_or(-1))
    }
}

/// Runs external programs on behalf of the manager.
pub trait CommandRunner {
    /// Runs a program to completion, capturing its output.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Runs a program and turns a non-zero exit into [`Error::CommandExit`].
    fn run_checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(program, args)?;
        if !output.success() {
            return Err(Error::CommandExit {
                command: program.to_string(),
                code: output.code.unwrap_or(-1),
                stderr: output.diagnostic(),
            });
        }
        Ok(output)
    }

    /// Returns true if the program can be found on `PATH`.
    fn has_program(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Runs commands directly on the host.
///
/// The process is expected to already hold root privileges; see
/// [`crate::privilege::Privileged`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!(program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .command_context(program)?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

//! Errors surfaced by the command line front end.

use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum CliError {
    /// An operation of the core library failed.
    #[snafu(context(false), display("{source}"))]
    Core { source: cifs_mount_core::Error },

    /// Terminal input or output failed.
    #[snafu(context(false), display("terminal I/O failed: {source}"))]
    Terminal { source: std::io::Error },

    /// Serializing `status --json` output failed.
    #[snafu(context(false), display("failed to encode JSON output: {source}"))]
    Json { source: serde_json::Error },
}

pub type Result<T> = std::result::Result<T, CliError>;

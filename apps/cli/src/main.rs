//! cifs-mount: mount, unmount and persist the CIFS shares of one server.
//!
//! Without a subcommand the tool runs an interactive menu; with one it runs
//! that single operation and exits.

#![forbid(unsafe_code)]

mod app;
mod error;
mod input;
mod menu;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cifs_mount_core::config::DEFAULT_CONFIG_PATH;
use cifs_mount_core::executor::SystemRunner;
use cifs_mount_core::mount_table::ProcMountTable;
use cifs_mount_core::{ManagerConfig, Privileged, ServiceIdentity};

use crate::app::App;
use crate::error::Result;
use crate::input::{InputConfirm, InputCredentialPrompt, StdinSource};
use crate::menu::Menu;

#[derive(Parser, Debug)]
#[command(name = "cifs-mount")]
#[command(version, about = "Manage CIFS/SMB share mounts for one file server")]
struct Cli {
    /// Configuration file
    #[arg(long, env = "CIFS_MOUNT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// File server host, overriding the configuration file
    #[arg(long)]
    server: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// List the shares the server advertises
    List,

    /// Mount a share under the mount base
    Mount {
        /// Share name on the server
        share: String,
    },

    /// Unmount a share by name or mount point
    Unmount {
        /// Share name or absolute mount point
        target: String,
    },

    /// Unmount every active CIFS mount
    UnmountAll,

    /// Write fstab entries so the shares mount at boot
    Setup {
        /// Share names on the server
        #[arg(required = true, num_args = 1..)]
        shares: Vec<String>,

        /// Replace existing entries for the server without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Show active CIFS mounts
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Maps clap's exit status onto ours: help and version succeed, usage errors exit 1.
fn usage_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(e.kind()));
        }
    };

    setup_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<ManagerConfig> {
    let mut config = ManagerConfig::load(&cli.config)?;
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let token = Privileged::acquire()?;
    let config = load_config(&cli)?;
    let identity = ServiceIdentity::resolve(&config)?;

    let runner = SystemRunner::new();
    let table = ProcMountTable::new(&config.mount_table);
    let app = App::new(&config, token, identity, &runner, &table);

    let mut stdin = StdinSource;
    let mut stdout = io::stdout();

    let Some(command) = cli.command else {
        app.ensure_credentials(&mut InputCredentialPrompt::new(&mut stdin), &mut stdout)?;
        return Menu::new(&app, &config.server).run(&mut stdin, &mut stdout);
    };

    match command {
        Commands::List => {
            app.ensure_credentials(&mut InputCredentialPrompt::new(&mut stdin), &mut stdout)?;
            app.list(&mut stdout)
        }
        Commands::Mount { share } => {
            app.ensure_credentials(&mut InputCredentialPrompt::new(&mut stdin), &mut stdout)?;
            app.mount(&share, &mut stdout)
        }
        Commands::Unmount { target } => app.unmount(&target, &mut stdout),
        Commands::UnmountAll => app.unmount_all(&mut stdout),
        Commands::Setup { shares, yes } => {
            app.ensure_credentials(&mut InputCredentialPrompt::new(&mut stdin), &mut stdout)?;
            if yes {
                app.setup(&shares, &mut |_: &[String]| true, &mut stdout)
            } else {
                app.setup(&shares, &mut InputConfirm::new(&mut stdin), &mut stdout)
            }
        }
        Commands::Status { json } => app.show(json, &mut stdout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cifs-mount").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_is_interactive() {
        let cli = parse(&[]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = parse(&["--server", "nas.local", "-vv", "mount", "Archives"]).unwrap();
        assert_eq!(cli.server.as_deref(), Some("nas.local"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Some(Commands::Mount {
                share: "Archives".to_string()
            })
        );

        let cli = parse(&["setup", "-y", "Archives", "Scans"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Setup {
                shares: vec!["Archives".to_string(), "Scans".to_string()],
                yes: true
            })
        );

        let cli = parse(&["unmount", "/mnt/Archives"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Unmount {
                target: "/mnt/Archives".to_string()
            })
        );

        let cli = parse(&["status", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Status { json: true }));
        assert_eq!(parse(&["unmount-all"]).unwrap().command, Some(Commands::UnmountAll));
    }

    #[test]
    fn test_usage_errors_exit_one() {
        for args in [&["mount"][..], &["unmount"], &["setup"], &["frobnicate"]] {
            let err = parse(args).unwrap_err();
            assert_eq!(usage_exit_code(err.kind()), 1, "args: {args:?}");
        }
        let help = parse(&["--help"]).unwrap_err();
        assert_eq!(usage_exit_code(help.kind()), 0);
    }
}

//! In-memory host for exercising share operations without root.
//!
//! [`FakeHost`] implements both [`CommandRunner`] and [`MountInspector`]:
//! `mount`/`umount` commands it receives change the mount table it reports,
//! the share enumeration tool prints a canned listing, and any other command
//! succeeds silently. Every invocation is recorded.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::executor::{CommandOutput, CommandRunner};
use crate::mount_table::{MountEntry, MountInspector};

#[derive(Debug, Default)]
struct FakeState {
    mounts: Vec<MountEntry>,
    busy: HashSet<PathBuf>,
    programs: HashSet<String>,
    installable: HashSet<String>,
    mount_error: Option<String>,
    failing: HashMap<String, String>,
    listing: String,
    commands: Vec<Vec<String>>,
}

/// Fake OS for tests.
#[derive(Debug, Default)]
pub struct FakeHost {
    state: RefCell<FakeState>,
}

impl FakeHost {
    /// A host with `smbclient` installed and an empty mount table.
    pub fn new() -> Self {
        let host = Self::default();
        host.install_program("smbclient");
        host.set_listing(
            "\tSharename       Type      Comment\n\t---------       ----      -------\n\tArchives        Disk\n",
        );
        host
    }

    /// Adds an active mount directly to the table.
    pub fn add_mount(&self, source: &str, target: impl Into<PathBuf>, fs_type: &str) {
        self.state.borrow_mut().mounts.push(MountEntry {
            source: source.to_string(),
            target: target.into(),
            fs_type: fs_type.to_string(),
            options: vec!["rw".to_string()],
        });
    }

    /// Makes `umount` of this target fail as if files were open.
    pub fn set_busy(&self, target: &Path) {
        self.state.borrow_mut().busy.insert(target.to_path_buf());
    }

    /// Makes every `mount` fail with this message on stderr.
    pub fn fail_mounts_with(&self, message: &str) {
        self.state.borrow_mut().mount_error = Some(message.to_string());
    }

    /// Makes every run of `program` exit 1 with this message on stderr.
    pub fn fail_command(&self, program: &str, message: &str) {
        self.state
            .borrow_mut()
            .failing
            .insert(program.to_string(), message.to_string());
    }

    pub fn install_program(&self, program: &str) {
        self.state.borrow_mut().programs.insert(program.to_string());
    }

    pub fn remove_program(&self, program: &str) {
        self.state.borrow_mut().programs.remove(program);
    }

    /// Lets the next package install command provide `program`.
    pub fn make_installable(&self, program: &str) {
        self.state
            .borrow_mut()
            .installable
            .insert(program.to_string());
    }

    /// Output of the share enumeration tool.
    pub fn set_listing(&self, listing: &str) {
        self.state.borrow_mut().listing = listing.to_string();
    }

    /// Every command run so far, program first.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.borrow().commands.clone()
    }

    fn handle_mount(state: &mut FakeState, args: &[&str]) -> CommandOutput {
        let positional: Vec<&str> = positional_args(args);
        let (Some(source), Some(target)) = (positional.first(), positional.get(1)) else {
            return failure(1, "mount: bad usage");
        };
        if let Some(message) = &state.mount_error {
            return failure(32, message);
        }
        let target = PathBuf::from(target);
        if state.mounts.iter().any(|m| m.target == target) {
            return failure(
                32,
                &format!("mount error(16): Device or resource busy: {}", target.display()),
            );
        }

        let fs_type = flag_value(args, "-t").unwrap_or("auto");
        let options = flag_value(args, "-o")
            .map(|o| o.split(',').map(String::from).collect())
            .unwrap_or_default();
        state.mounts.push(MountEntry {
            source: source.to_string(),
            target,
            fs_type: fs_type.to_string(),
            options,
        });
        success("")
    }

    fn handle_umount(state: &mut FakeState, args: &[&str]) -> CommandOutput {
        let Some(target) = positional_args(args).first().map(PathBuf::from) else {
            return failure(1, "umount: bad usage");
        };
        if state.busy.contains(&target) {
            return failure(32, &format!("umount: {}: target is busy.", target.display()));
        }
        let Some(index) = state.mounts.iter().position(|m| m.target == target) else {
            return failure(32, &format!("umount: {}: not mounted.", target.display()));
        };
        state.mounts.remove(index);
        success("")
    }
}

/// Arguments that are neither flags nor the value of `-t`/`-o`.
fn positional_args<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if *arg == "-t" || *arg == "-o" {
            skip_next = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        out.push(*arg);
    }
    out
}

fn flag_value<'a>(args: &[&'a str], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| *a == flag)
        .and_then(|i| args.get(i + 1).copied())
}

fn success(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn failure(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: format!("{stderr}\n"),
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut state = self.state.borrow_mut();
        let mut record = vec![program.to_string()];
        record.extend(args.iter().map(|a| a.to_string()));
        state.commands.push(record);

        if let Some(message) = state.failing.get(program) {
            return Ok(failure(1, message));
        }

        let output = match program {
            "mount" => Self::handle_mount(&mut state, args),
            "umount" => Self::handle_umount(&mut state, args),
            _ if state.programs.contains(program) && args.first() == Some(&"-L") => {
                success(&state.listing)
            }
            _ if args.iter().any(|a| *a == "install") => {
                let installable: Vec<String> = state.installable.drain().collect();
                state.programs.extend(installable);
                success("")
            }
            _ => success(""),
        };
        Ok(output)
    }

    fn has_program(&self, program: &str) -> bool {
        self.state.borrow().programs.contains(program)
    }
}

impl MountInspector for FakeHost {
    fn active_mounts(&self) -> Result<Vec<MountEntry>> {
        Ok(self.state.borrow().mounts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_and_umount_update_table() {
        let host = FakeHost::new();
        let out = host
            .run("mount", &["-t", "cifs", "//s/a", "/mnt/a", "-o", "vers=2.0"])
            .unwrap();
        assert!(out.success());

        let mounts = host.active_mounts().unwrap();
        assert_eq!(mounts[0].source, "//s/a");
        assert_eq!(mounts[0].fs_type, "cifs");
        assert_eq!(mounts[0].options, vec!["vers=2.0"]);

        assert!(host.run("umount", &["-f", "/mnt/a"]).unwrap().success());
        assert!(host.active_mounts().unwrap().is_empty());

        let again = host.run("umount", &["-f", "/mnt/a"]).unwrap();
        assert!(again.stderr.contains("not mounted"));
    }

    #[test]
    fn test_failing_command() {
        let host = FakeHost::new();
        host.fail_command("systemctl", "Failed to connect to bus");
        let out = host.run("systemctl", &["daemon-reload"]).unwrap();
        assert_eq!(out.code, Some(1));
        assert_eq!(out.diagnostic(), "Failed to connect to bus");
        assert_eq!(host.commands().len(), 1);
    }

    #[test]
    fn test_install_provides_program() {
        let host = FakeHost::new();
        host.remove_program("smbclient");
        host.make_installable("smbclient");
        assert!(!host.has_program("smbclient"));

        host.run("apt-get", &["install", "-y", "smbclient"]).unwrap();
        assert!(host.has_program("smbclient"));
        assert_eq!(host.commands().len(), 1);
    }
}

//! Interactive menu.
//!
//! The loop is a small state machine: it waits for a choice, executes it,
//! and goes back to waiting until the user quits or input ends.

use std::io::Write;

use tracing::debug;

use crate::app::App;
use crate::error::{CliError, Result};
use crate::input::{InputConfirm, InputSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    List,
    Mount,
    Unmount,
    UnmountAll,
    Setup,
    ShowCurrent,
    Quit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 7] = [
        MenuChoice::List,
        MenuChoice::Mount,
        MenuChoice::Unmount,
        MenuChoice::UnmountAll,
        MenuChoice::Setup,
        MenuChoice::ShowCurrent,
        MenuChoice::Quit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::List => "List shares on the server",
            MenuChoice::Mount => "Mount a share",
            MenuChoice::Unmount => "Unmount a share",
            MenuChoice::UnmountAll => "Unmount all shares",
            MenuChoice::Setup => "Configure automount at boot",
            MenuChoice::ShowCurrent => "Show mounted shares",
            MenuChoice::Quit => "Quit",
        }
    }

    /// Parses a menu number (1-based) or `q`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Some(MenuChoice::Quit);
        }
        let index: usize = input.parse().ok()?;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    AwaitingChoice,
    Executing(MenuChoice),
    Exiting,
}

pub struct Menu<'m, 'a> {
    app: &'m App<'a>,
    server: &'m str,
    state: MenuState,
}

impl<'m, 'a> Menu<'m, 'a> {
    pub fn new(app: &'m App<'a>, server: &'m str) -> Self {
        Self {
            app,
            server,
            state: MenuState::AwaitingChoice,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> MenuState {
        self.state
    }

    /// Runs until the user quits or input ends.
    pub fn run(&mut self, input: &mut dyn InputSource, out: &mut dyn Write) -> Result<()> {
        while self.state != MenuState::Exiting {
            self.step(input, out)?;
        }
        Ok(())
    }

    /// Performs one transition.
    pub fn step(&mut self, input: &mut dyn InputSource, out: &mut dyn Write) -> Result<()> {
        let next = match self.state {
            MenuState::AwaitingChoice => self.await_choice(input, out)?,
            MenuState::Executing(choice) => match self.execute(choice, input, out) {
                Ok(next) => next,
                Err(e @ CliError::Terminal { .. }) => return Err(e),
                Err(e) => {
                    writeln!(out, "Error: {e}")?;
                    MenuState::AwaitingChoice
                }
            },
            MenuState::Exiting => MenuState::Exiting,
        };
        debug!(from = ?self.state, to = ?next, "menu transition");
        self.state = next;
        Ok(())
    }

    fn await_choice(
        &self,
        input: &mut dyn InputSource,
        out: &mut dyn Write,
    ) -> Result<MenuState> {
        writeln!(out)?;
        writeln!(out, "CIFS shares on {}", self.server)?;
        for (i, choice) in MenuChoice::ALL.iter().enumerate() {
            writeln!(out, "  {}) {}", i + 1, choice.label())?;
        }
        out.flush()?;

        let Some(line) = input.read_line("Choice: ")? else {
            return Ok(MenuState::Exiting);
        };
        Ok(match MenuChoice::parse(&line) {
            Some(MenuChoice::Quit) => MenuState::Exiting,
            Some(choice) => MenuState::Executing(choice),
            None => {
                writeln!(out, "Invalid choice '{}'.", line.trim())?;
                MenuState::AwaitingChoice
            }
        })
    }

    fn execute(
        &self,
        choice: MenuChoice,
        input: &mut dyn InputSource,
        out: &mut dyn Write,
    ) -> Result<MenuState> {
        match choice {
            MenuChoice::List => self.app.list(out)?,
            MenuChoice::Mount => {
                let Some(name) = input.read_line("Share to mount: ")? else {
                    return Ok(MenuState::Exiting);
                };
                self.app.mount(name.trim(), out)?;
            }
            MenuChoice::Unmount => {
                let Some(target) = input.read_line("Share name or mount point to unmount: ")?
                else {
                    return Ok(MenuState::Exiting);
                };
                self.app.unmount(target.trim(), out)?;
            }
            MenuChoice::UnmountAll => self.app.unmount_all(out)?,
            MenuChoice::Setup => {
                let Some(line) = input.read_line("Shares to mount at boot: ")? else {
                    return Ok(MenuState::Exiting);
                };
                let names = split_share_names(&line);
                let mut confirm = InputConfirm::new(input);
                self.app.setup(&names, &mut confirm, out)?;
            }
            MenuChoice::ShowCurrent => self.app.show(false, out)?,
            MenuChoice::Quit => return Ok(MenuState::Exiting),
        }
        Ok(MenuState::AwaitingChoice)
    }
}

/// Splits a line of share names on whitespace and commas.
fn split_share_names(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect()
}

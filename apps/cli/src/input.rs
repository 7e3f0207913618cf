//! Line-oriented user input.
//!
//! The menu and prompts read through [`InputSource`], so they can be driven
//! by a script in tests instead of a terminal.

#[cfg(test)]
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use cifs_mount_core::{Confirm, CredentialPrompt};
use secrecy::SecretString;

pub trait InputSource {
    /// Shows `prompt` and reads one line without its newline. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Like [`InputSource::read_line`] but without echo.
    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads from the process's stdin, prompts on stdout.
#[derive(Debug, Default)]
pub struct StdinSource;

impl InputSource for StdinSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        rpassword::prompt_password(prompt).map(Some)
    }
}

/// Pre-recorded answers; records every prompt shown.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    pub prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }
}

#[cfg(test)]
impl InputSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.read_line(prompt)
    }
}

/// Asks a yes/no question; anything but `y`/`yes` is a no.
pub fn ask_yes_no(input: &mut dyn InputSource, question: &str) -> io::Result<bool> {
    let answer = input.read_line(&format!("{question} [y/N]: "))?;
    Ok(matches!(
        answer.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("y" | "yes")
    ))
}

/// Asks before existing fstab entries are replaced.
///
/// A failed read counts as a decline.
pub struct InputConfirm<'a> {
    input: &'a mut dyn InputSource,
}

impl<'a> InputConfirm<'a> {
    pub fn new(input: &'a mut dyn InputSource) -> Self {
        Self { input }
    }
}

impl Confirm for InputConfirm<'_> {
    fn confirm_replace(&mut self, existing: &[String]) -> bool {
        let mut question = String::from("These fstab entries will be replaced:\n");
        for line in existing {
            question.push_str("  ");
            question.push_str(line);
            question.push('\n');
        }
        question.push_str("Continue?");
        ask_yes_no(self.input, &question).unwrap_or(false)
    }
}

/// Collects credentials through an [`InputSource`].
pub struct InputCredentialPrompt<'a> {
    input: &'a mut dyn InputSource,
}

impl<'a> InputCredentialPrompt<'a> {
    pub fn new(input: &'a mut dyn InputSource) -> Self {
        Self { input }
    }
}

fn required(value: Option<String>, what: &str) -> io::Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} is required"),
        )),
    }
}

impl CredentialPrompt for InputCredentialPrompt<'_> {
    fn username(&mut self) -> io::Result<String> {
        required(self.input.read_line("Username: ")?, "username")
    }

    fn password(&mut self) -> io::Result<SecretString> {
        let password = self.input.read_secret("Password: ")?.unwrap_or_default();
        Ok(SecretString::from(password))
    }

    fn domain(&mut self) -> io::Result<Option<String>> {
        Ok(self
            .input
            .read_line("Domain (leave empty for none): ")?
            .filter(|d| !d.trim().is_empty()))
    }
}

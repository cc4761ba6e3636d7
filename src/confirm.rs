//! User confirmation dialog for model-requested command execution.
//!
//! Nothing runs without consent. The dialog shows the command, adds a
//! highlighted warning when it matches a destructive pattern, and defaults
//! to "no" on empty or unrecognized input.

use crate::config::ColorMode;
use crate::tools::is_destructive;
use anyhow::Result;
use colored::Colorize;
use std::io::{self, BufRead, IsTerminal, Write};
use tracing::info;

/// Applies the configured color mode to all colored output.
pub fn apply_color_mode(mode: ColorMode) {
    match mode {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {
            if !io::stdout().is_terminal() {
                colored::control::set_override(false);
            }
        }
    }
}

/// Handles the consent dialog for tool execution.
pub struct ConfirmUi;

impl ConfirmUi {
    pub fn new() -> Self {
        Self
    }

    /// Asks the user whether to run `command`, reading from stdin.
    pub fn confirm_execution(&self, command: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        self.confirm_execution_with_io(command, &mut input, &mut output)
    }

    /// Consent dialog over injected I/O streams (for testing).
    ///
    /// Returns `true` only on an explicit "y"/"yes". Empty input and anything
    /// else decline.
    pub fn confirm_execution_with_io<R: BufRead, W: Write>(
        &self,
        command: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<bool> {
        writeln!(output)?;
        writeln!(output, "The assistant wants to run:")?;
        writeln!(output, "    {}", command.bold())?;

        if is_destructive(command) {
            writeln!(
                output,
                "{}",
                "⚠ This command looks destructive. Review it carefully.".red().bold()
            )?;
        }

        write!(output, "Run this command? [y/N]: ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line.trim().to_ascii_lowercase();

        let approved = matches!(answer.as_str(), "y" | "yes");
        info!(
            "User {} execution of: {}",
            if approved { "approved" } else { "declined" },
            command
        );
        Ok(approved)
    }
}

impl Default for ConfirmUi {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(command: &str, answer: &str) -> (bool, String) {
        colored::control::set_override(false);
        let ui = ConfirmUi::new();
        let mut input = Cursor::new(answer.as_bytes().to_vec());
        let mut output = Vec::new();
        let approved = ui
            .confirm_execution_with_io(command, &mut input, &mut output)
            .unwrap();
        (approved, String::from_utf8(output).unwrap())
    }

    #[test]
    fn yes_approves() {
        assert!(ask("ls -la", "y\n").0);
        assert!(ask("ls -la", "YES\n").0);
    }

    #[test]
    fn empty_input_declines() {
        assert!(!ask("ls -la", "\n").0);
    }

    #[test]
    fn unrecognized_input_declines() {
        assert!(!ask("ls -la", "sure\n").0);
        assert!(!ask("ls -la", "n\n").0);
    }

    #[test]
    fn dialog_shows_the_command() {
        let (_, out) = ask("df -h", "n\n");
        assert!(out.contains("df -h"));
        assert!(out.contains("[y/N]"));
    }

    #[test]
    fn destructive_command_gets_a_warning() {
        let (_, out) = ask("rm -rf /tmp/build", "n\n");
        assert!(out.contains("destructive"));
    }

    #[test]
    fn benign_command_has_no_warning() {
        let (_, out) = ask("ls -la", "y\n");
        assert!(!out.contains("destructive"));
    }
}

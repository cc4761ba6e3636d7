//! The `execute` tool: declaration, destructive-command screening, and
//! shell execution with captured output.
//!
//! Exactly one tool is declared to the model. When the model calls it, the
//! command is screened against destructive patterns, confirmed with the user
//! (see [`crate::confirm`]), run via `sh -c`, and the captured outcome is fed
//! back into history for the follow-up round.

use anyhow::{anyhow, Result};
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::process::{Command, Output};
use std::sync::LazyLock;
use tracing::info;

/// Name of the single tool declared to the model.
pub const EXECUTE_TOOL_NAME: &str = "execute";

/// Maximum follow-up completion rounds after tool execution.
pub const MAX_TOOL_ROUNDS: usize = 4;

static DESTRUCTIVE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\brm\s+(-[a-zA-Z]*[rf][a-zA-Z]*\s+)+",
        r"\bmkfs(\.\w+)?\b",
        r"\bdd\s+.*\bof=/dev/",
        r">\s*/dev/sd",
        r"\bshutdown\b",
        r"\breboot\b",
        r":\(\)\s*\{.*\};\s*:",
        r"\bchmod\s+(-[a-zA-Z]+\s+)*[0-7]{3,4}\s+/\s*$",
        r"\b(chmod|chown)\s+-R\b.*\s+/\s*($|;)",
        r"\bgit\s+.*--force\b",
    ])
    .expect("destructive pattern set is valid")
});

/// Returns true when the command matches a known destructive pattern.
///
/// This is a warning heuristic, not a sandbox: matches get an extra
/// highlighted confirmation, non-matches still require consent.
pub fn is_destructive(command: &str) -> bool {
    DESTRUCTIVE_PATTERNS.is_match(command)
}

/// JSON declaration of the `execute` tool for the request payload.
pub fn execute_tool_declaration() -> serde_json::Value {
    json!({
        "type": "function",
        "function": {
            "name": EXECUTE_TOOL_NAME,
            "description": "Execute a shell command on the user's machine and return its output, exit code, and errors. The user must confirm before anything runs.",
            "parameters": {
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    }
                },
                "required": ["command"]
            }
        }
    })
}

/// Arguments of an `execute` tool call.
#[derive(Debug, Deserialize)]
pub struct ExecuteArgs {
    pub command: String,
}

impl ExecuteArgs {
    /// Parses the JSON-encoded arguments string from a tool call.
    pub fn parse(arguments: &str) -> Result<Self> {
        serde_json::from_str(arguments)
            .map_err(|e| anyhow!("invalid execute arguments {:?}: {}", arguments, e))
    }
}

/// Captured outcome of a shell command, fed back to the model as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutcome {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Trait for running shell commands.
///
/// This abstraction enables testing the tool loop without spawning real
/// processes.
pub trait ProcessRunner: Send + Sync {
    /// Runs a command line through the shell and returns its output.
    fn run_shell(&self, command: &str) -> Result<Output>;

    /// Checks that the shell itself is available.
    fn shell_exists(&self) -> bool;
}

/// Default process runner using `sh -c`.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run_shell(&self, command: &str) -> Result<Output> {
        Ok(Command::new("sh").arg("-c").arg(command).output()?)
    }

    fn shell_exists(&self) -> bool {
        which::which("sh").is_ok()
    }
}

/// Runs a confirmed command and captures its outcome.
pub fn run_command(runner: &dyn ProcessRunner, command: &str) -> Result<ToolOutcome> {
    if !runner.shell_exists() {
        return Err(anyhow!("No shell found in PATH; cannot execute commands"));
    }

    info!("Executing tool command: {}", command);
    let output = runner.run_shell(command)?;

    Ok(ToolOutcome {
        // Signal-terminated processes have no code; report -1
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    struct FakeRunner {
        stdout: &'static str,
        code: i32,
    }

    impl ProcessRunner for FakeRunner {
        fn run_shell(&self, _command: &str) -> Result<Output> {
            Ok(Output {
                status: ExitStatus::from_raw(self.code << 8),
                stdout: self.stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
            })
        }

        fn shell_exists(&self) -> bool {
            true
        }
    }

    struct NoShellRunner;

    impl ProcessRunner for NoShellRunner {
        fn run_shell(&self, _command: &str) -> Result<Output> {
            unreachable!("shell_exists is checked first")
        }

        fn shell_exists(&self) -> bool {
            false
        }
    }

    #[test]
    fn destructive_patterns_match_obvious_cases() {
        assert!(is_destructive("rm -rf /tmp/x"));
        assert!(is_destructive("sudo rm -fr ~/projects"));
        assert!(is_destructive("mkfs.ext4 /dev/sda1"));
        assert!(is_destructive("dd if=/dev/zero of=/dev/sda"));
        assert!(is_destructive("shutdown -h now"));
        assert!(is_destructive(":(){ :|:& };:"));
        assert!(is_destructive("git push --force origin main"));
    }

    #[test]
    fn benign_commands_are_not_flagged() {
        assert!(!is_destructive("ls -la"));
        assert!(!is_destructive("grep -rf patterns.txt ."));
        assert!(!is_destructive("df -h"));
        assert!(!is_destructive("echo rm"));
        assert!(!is_destructive("git push origin main"));
    }

    #[test]
    fn execute_args_parse_valid_json() {
        let args = ExecuteArgs::parse(r#"{"command":"ls -la"}"#).unwrap();
        assert_eq!(args.command, "ls -la");
    }

    #[test]
    fn execute_args_reject_garbage() {
        assert!(ExecuteArgs::parse("not json").is_err());
        assert!(ExecuteArgs::parse(r#"{"cmd":"ls"}"#).is_err());
    }

    #[test]
    fn run_command_captures_outcome() {
        let runner = FakeRunner {
            stdout: "3\n",
            code: 0,
        };
        let outcome = run_command(&runner, "ls -1 | wc -l").unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "3\n");
        assert!(outcome.stderr.is_empty());
    }

    #[test]
    fn run_command_reports_nonzero_exit() {
        let runner = FakeRunner {
            stdout: "",
            code: 2,
        };
        let outcome = run_command(&runner, "false").unwrap();
        assert_eq!(outcome.exit_code, 2);
    }

    #[test]
    fn run_command_requires_a_shell() {
        let err = run_command(&NoShellRunner, "ls").unwrap_err();
        assert!(err.to_string().contains("No shell"));
    }

    #[test]
    fn outcome_serializes_to_json() {
        let outcome = ToolOutcome {
            exit_code: 0,
            stdout: "ok\n".to_string(),
            stderr: String::new(),
        };
        let json = outcome.to_json();
        assert!(json.contains("\"exit_code\":0"));
        assert!(json.contains("ok\\n"));
    }

    #[test]
    fn declaration_names_the_execute_tool() {
        let decl = execute_tool_declaration();
        assert_eq!(decl["function"]["name"], EXECUTE_TOOL_NAME);
        assert_eq!(decl["function"]["parameters"]["required"][0], "command");
    }
}

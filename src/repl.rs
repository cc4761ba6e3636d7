//! Interactive loop with line-editor integration.
//!
//! The REPL alternates between two prompts. At `llmsh>` the user types a
//! natural-language request or a `:directive`. When the assistant's reply
//! looks like a runnable command it is inserted pre-filled into a `$` prompt
//! buffer, where the user can edit it, accept it with Enter to run it, or
//! cancel with Ctrl-C.

use crate::config::Config;
use crate::confirm::ConfirmUi;
use crate::session::ChatSession;
use crate::tools::{is_destructive, run_command, SystemProcessRunner};
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use tracing::info;

const HELP: &str = "\
Directives:
  :help            show this help
  :clear           reset the session history
  :history         show the session history
  :pause           stop recording history (stateless turns)
  :resume          resume recording history
  :quit            exit

Anything else is sent to the assistant. Replies that look like commands are
inserted into a `$` buffer: edit them, press Enter to run, Ctrl-C to discard.";

/// Heuristic for deciding whether a reply belongs in the command buffer.
///
/// Multi-line or prose-like replies are printed instead of inserted.
pub fn looks_like_command(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && !trimmed.contains('\n')
        && trimmed.len() <= 200
        && !trimmed.contains("```")
        && !trimmed.ends_with('.')
}

/// Runs the interactive session until `:quit` or EOF.
pub async fn run(allow_exec: bool, context_fragments: Vec<String>) -> Result<()> {
    let config = Config::load()?;
    let mut session = ChatSession::new(&config, allow_exec);
    let mut editor: Editor<(), FileHistory> = Editor::new()?;
    let confirm = ConfirmUi::new();

    // Caller-supplied context applies to the first turn only
    let mut first_turn_context = Some(context_fragments);
    let mut pending_command: Option<String> = None;

    println!("{}", "llmsh interactive session. :help for directives, :quit to exit.".dimmed());

    loop {
        if let Some(command) = pending_command.take() {
            match editor.readline_with_initial("$ ", (&command, "")) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        run_buffer_command(&confirm, &line)?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "(discarded)".dimmed());
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
            continue;
        }

        let line = match editor.readline("llmsh> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        if let Some(directive) = input.strip_prefix(':') {
            if handle_directive(&mut session, directive)? {
                break;
            }
            continue;
        }

        let context = first_turn_context.take().unwrap_or_default();
        match session.ask(input, &context, None).await {
            Ok(answer) => {
                if looks_like_command(&answer) {
                    pending_command = Some(answer);
                } else {
                    println!("{}", answer.cyan());
                }
            }
            Err(e) => eprintln!("{} {:#}", "error:".red().bold(), e),
        }
    }

    Ok(())
}

/// Handles a `:directive`. Returns true when the session should end.
fn handle_directive(session: &mut ChatSession, directive: &str) -> Result<bool> {
    match directive.trim() {
        "quit" | "q" | "exit" => return Ok(true),
        "help" => println!("{}", HELP),
        "clear" => {
            session.clear_history();
            println!("{}", "History cleared.".dimmed());
        }
        "pause" => {
            session.pause_history();
            println!("{}", "History paused; turns are now stateless.".dimmed());
        }
        "resume" => {
            session.resume_history();
            println!("{}", "History resumed.".dimmed());
        }
        "history" => {
            for message in session.history().messages() {
                let role = format!("{:?}", message.role).to_lowercase();
                let content = message.content.as_deref().unwrap_or("<tool call>");
                println!("{} {}", format!("[{}]", role).dimmed(), content);
            }
        }
        other => println!("Unknown directive ':{}'. Try :help.", other),
    }
    Ok(false)
}

/// Runs a command the user accepted from the `$` buffer.
///
/// Accepting the buffer is itself consent, so only destructive-looking
/// commands get an extra confirmation pass.
fn run_buffer_command(confirm: &ConfirmUi, command: &str) -> Result<()> {
    if is_destructive(command) && !confirm.confirm_execution(command)? {
        println!("{}", "(not run)".dimmed());
        return Ok(());
    }

    info!("Running buffer command: {}", command);
    let outcome = run_command(&SystemProcessRunner, command)?;
    if !outcome.stdout.is_empty() {
        print!("{}", outcome.stdout);
    }
    if !outcome.stderr.is_empty() {
        eprint!("{}", outcome.stderr);
    }
    if outcome.exit_code != 0 {
        eprintln!("{}", format!("exit code {}", outcome.exit_code).red());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_command_lines_go_to_the_buffer() {
        assert!(looks_like_command("df -h"));
        assert!(looks_like_command("ls -1 | wc -l"));
        assert!(looks_like_command("find . -name '*.rs' -mtime -1"));
    }

    #[test]
    fn prose_and_multiline_replies_are_printed() {
        assert!(!looks_like_command("You can use df to check disk usage."));
        assert!(!looks_like_command("df -h\nfree -h"));
        assert!(!looks_like_command("```\ndf -h\n```"));
        assert!(!looks_like_command(""));
    }

    #[test]
    fn very_long_replies_are_printed() {
        let long = "x".repeat(250);
        assert!(!looks_like_command(&long));
    }
}

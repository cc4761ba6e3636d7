//! Context merging for prompt augmentation.
//!
//! Callers can hand the assistant extra material two ways: explicit
//! `--context` fragments and piped stdin. Both are folded into one labelled
//! text blob that gets appended to the outgoing prompt.

use std::io::{IsTerminal, Read};

/// Merges explicit fragments and piped input into a single blob.
///
/// Explicit fragments come first, in the order given, then piped input.
/// Blank sources are skipped. Merging nothing yields `None`.
pub fn merge_context(fragments: &[String], piped: Option<&str>) -> Option<String> {
    let mut sections = Vec::new();

    for fragment in fragments {
        let trimmed = fragment.trim();
        if !trimmed.is_empty() {
            sections.push(format!("[context]\n{}", trimmed));
        }
    }

    if let Some(piped) = piped {
        let trimmed = piped.trim();
        if !trimmed.is_empty() {
            sections.push(format!("[piped input]\n{}", trimmed));
        }
    }

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// Reads piped stdin, if any. Returns `None` when stdin is a terminal so
/// interactive sessions are never blocked waiting for input.
pub fn read_piped_stdin() -> Option<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut buf = String::new();
    match stdin.lock().read_to_string(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf),
        Err(_) => None,
    }
}

/// Appends merged context to a prompt.
pub fn augment_prompt(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) => format!("{}\n\n{}", prompt, ctx),
        None => prompt.to_string(),
    }
}

//! Turn orchestration: context merge, history update, request build, API
//! call, tool execution, follow-up rounds.
//!
//! One `ChatSession` lives for the duration of an interactive run. Each turn
//! re-resolves configuration, merges caller context into the prompt, records
//! the exchange in the bounded history, and, when execution is enabled,
//! drives the confirm/execute/re-query loop for model tool calls.

use crate::api::{ChatClient, ToolCall};
use crate::config::Config;
use crate::confirm::ConfirmUi;
use crate::context::{augment_prompt, merge_context};
use crate::history::{ChatMessage, SessionHistory};
use crate::tools::{
    execute_tool_declaration, run_command, ExecuteArgs, ProcessRunner, SystemProcessRunner,
    EXECUTE_TOOL_NAME, MAX_TOOL_ROUNDS,
};
use anyhow::{anyhow, Result};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a shell assistant running inside the user's terminal. \
When the user describes a task, reply with a single ready-to-run POSIX shell command line \
and nothing else: no markdown, no backticks, no explanation. When the request is a question \
rather than a task, answer briefly in plain text. If an `execute` tool is available, you may \
call it to run a command and use its output; the user confirms every execution.";

/// Trait for obtaining user consent before running a tool command.
///
/// Separating the dialog from the loop lets tests drive the tool path with
/// canned answers.
pub trait ExecutionApprover {
    fn approve(&self, command: &str) -> Result<bool>;
}

impl ExecutionApprover for ConfirmUi {
    fn approve(&self, command: &str) -> Result<bool> {
        self.confirm_execution(command)
    }
}

/// A single interactive chat session with bounded memory.
pub struct ChatSession {
    history: SessionHistory,
    allow_exec: bool,
}

impl ChatSession {
    pub fn new(config: &Config, allow_exec: bool) -> Self {
        let mut history = SessionHistory::new(config.history_max);
        history.push(ChatMessage::system(SYSTEM_PROMPT));
        Self {
            history,
            allow_exec,
        }
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn pause_history(&mut self) {
        self.history.pause();
    }

    pub fn resume_history(&mut self) {
        self.history.resume();
    }

    /// Runs one turn end to end and returns the assistant's reply text.
    pub async fn ask(
        &mut self,
        prompt: &str,
        context_fragments: &[String],
        piped: Option<&str>,
    ) -> Result<String> {
        let config = Config::load()?;
        let client = ChatClient::new(&config)?;
        self.ask_with_deps(
            &config,
            &client,
            &SystemProcessRunner,
            &ConfirmUi::new(),
            prompt,
            context_fragments,
            piped,
        )
        .await
    }

    /// Turn orchestration with injected dependencies (for testing).
    #[allow(clippy::too_many_arguments)]
    pub async fn ask_with_deps(
        &mut self,
        config: &Config,
        client: &ChatClient,
        runner: &dyn ProcessRunner,
        approver: &dyn ExecutionApprover,
        prompt: &str,
        context_fragments: &[String],
        piped: Option<&str>,
    ) -> Result<String> {
        let trimmed = prompt.trim();
        let merged = merge_context(context_fragments, piped);
        if trimmed.is_empty() && merged.is_none() {
            return Err(anyhow!("Empty prompt. Describe what you want the shell to do."));
        }

        let user_text = augment_prompt(trimmed, merged.as_deref());

        // Working copy of the conversation for this turn. While the session
        // store is paused the turn runs statelessly on the system prompt only.
        let mut conversation: Vec<ChatMessage> = if self.history.is_active() {
            self.history.to_vec()
        } else {
            vec![ChatMessage::system(SYSTEM_PROMPT)]
        };

        let user_message = ChatMessage::user(user_text);
        conversation.push(user_message.clone());
        self.history.push(user_message);

        let tools = self.allow_exec.then(|| vec![execute_tool_declaration()]);

        for round in 0..=MAX_TOOL_ROUNDS {
            let reply = client
                .complete(config, &conversation, tools.as_deref())
                .await?;

            if !reply.has_tool_calls() {
                let text = reply.content.unwrap_or_default();
                self.history.push(ChatMessage::assistant(text.clone()));
                return Ok(text);
            }

            if round == MAX_TOOL_ROUNDS {
                break;
            }

            let calls = reply.tool_calls.unwrap_or_default();
            info!("Model requested {} tool call(s) in round {}", calls.len(), round);

            let assistant = ChatMessage::assistant_tool_calls(reply.content.clone(), calls.clone());
            conversation.push(assistant.clone());
            self.history.push(assistant);

            for call in &calls {
                let result = self.handle_tool_call(runner, approver, call);
                let message = ChatMessage::tool_result(call.id.clone(), result);
                conversation.push(message.clone());
                self.history.push(message);
            }
        }

        Err(anyhow!(
            "Gave up after {} tool rounds without a final answer",
            MAX_TOOL_ROUNDS
        ))
    }

    /// Resolves one tool call to the result text fed back to the model.
    ///
    /// Failures are reported to the model rather than aborting the turn: an
    /// unknown tool, bad arguments, or a declined confirmation all become
    /// tool results the follow-up round can react to.
    fn handle_tool_call(
        &self,
        runner: &dyn ProcessRunner,
        approver: &dyn ExecutionApprover,
        call: &ToolCall,
    ) -> String {
        if call.function.name != EXECUTE_TOOL_NAME {
            warn!("Model called unknown tool: {}", call.function.name);
            return format!("error: unknown tool '{}'", call.function.name);
        }

        let args = match ExecuteArgs::parse(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!("Bad tool arguments: {}", e);
                return format!("error: {}", e);
            }
        };

        match approver.approve(&args.command) {
            Ok(true) => {}
            Ok(false) => return "execution declined by user".to_string(),
            Err(e) => return format!("error: confirmation failed: {}", e),
        }

        match run_command(runner, &args.command) {
            Ok(outcome) => outcome.to_json(),
            Err(e) => format!("error: {}", e),
        }
    }
}

//! llmsh - natural-language shell assistant library.
//!
//! This library wraps a chat-completion HTTP API to generate and complete
//! shell commands from natural-language prompts. It supports:
//!
//! - **Command generation** via any OpenAI-compatible chat endpoint
//! - **Bounded session memory** kept in-memory across interactive turns
//! - **Tool-calling** where the model runs shell commands under user consent
//! - **Context merging** of explicit fragments and piped input
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Settings resolved from env vars and the config file
//! - [`context`] - Merging caller context into the outgoing prompt
//! - [`history`] - Size-bounded, role-tagged session history
//! - [`api`] - Request building and response parsing for the chat endpoint
//! - [`http_client`] - HTTP transport abstraction
//! - [`tools`] - The `execute` tool: screening and shell execution
//! - [`confirm`] - User consent dialogs
//! - [`session`] - Turn orchestration and the tool-call loop
//! - [`repl`] - Interactive loop with command-buffer insertion
//!
//! # Example
//!
//! ```ignore
//! use llmsh::config::Config;
//! use llmsh::session::ChatSession;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let mut session = ChatSession::new(&config, false);
//!
//!     let answer = session.ask("how much disk space is left", &[], None).await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod confirm;
pub mod context;
pub mod history;
pub mod http_client;
pub mod repl;
pub mod session;
pub mod tools;

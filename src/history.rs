//! Bounded in-memory session history.
//!
//! The history is an ordered list of role-tagged chat messages capped at a
//! configurable size. When the cap is exceeded the oldest non-system message
//! is evicted, so the system prompt survives trimming. The store can be
//! paused: while inactive, turns are answered statelessly and nothing is
//! recorded.

use crate::api::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Role of a chat message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single chat message, shaped for the chat-completions wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Present on assistant messages that requested tool execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Present on tool messages, linking the result to its originating call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message carrying the model's tool-call request.
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    /// Tool result message answering the call with the given id.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Size-bounded, role-tagged session memory.
#[derive(Debug)]
pub struct SessionHistory {
    messages: VecDeque<ChatMessage>,
    max_messages: usize,
    active: bool,
}

impl SessionHistory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages: max_messages.max(1),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Pause recording. Messages pushed while paused are dropped.
    pub fn pause(&mut self) {
        self.active = false;
    }

    pub fn resume(&mut self) {
        self.active = true;
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record a message, evicting the oldest non-system message when over cap.
    pub fn push(&mut self, message: ChatMessage) {
        if !self.active {
            return;
        }
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            let victim = self
                .messages
                .iter()
                .position(|m| m.role != Role::System)
                // All-system history cannot exceed the cap in practice; evict
                // from the front rather than grow without bound.
                .unwrap_or(0);
            self.messages.remove(victim);
        }
    }

    /// Drop everything except system messages.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// Snapshot for building a request payload.
    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(max: usize, count: usize) -> SessionHistory {
        let mut h = SessionHistory::new(max);
        h.push(ChatMessage::system("be brief"));
        for i in 0..count {
            h.push(ChatMessage::user(format!("q{}", i)));
            h.push(ChatMessage::assistant(format!("a{}", i)));
        }
        h
    }

    #[test]
    fn push_respects_cap() {
        let h = filled(5, 10);
        assert_eq!(h.len(), 5);
    }

    #[test]
    fn system_message_survives_trimming() {
        let h = filled(3, 10);
        assert_eq!(h.messages().next().unwrap().role, Role::System);
    }

    #[test]
    fn eviction_drops_oldest_non_system_first() {
        let mut h = SessionHistory::new(3);
        h.push(ChatMessage::system("sys"));
        h.push(ChatMessage::user("first"));
        h.push(ChatMessage::user("second"));
        h.push(ChatMessage::user("third"));
        let contents: Vec<_> = h
            .messages()
            .map(|m| m.content.clone().unwrap())
            .collect();
        assert_eq!(contents, vec!["sys", "second", "third"]);
    }

    #[test]
    fn paused_history_records_nothing() {
        let mut h = SessionHistory::new(10);
        h.pause();
        h.push(ChatMessage::user("ignored"));
        assert!(h.is_empty());
        h.resume();
        h.push(ChatMessage::user("kept"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn clear_keeps_system_prompt() {
        let mut h = filled(10, 3);
        h.clear();
        assert_eq!(h.len(), 1);
        assert_eq!(h.messages().next().unwrap().role, Role::System);
    }

    #[test]
    fn tool_result_links_call_id() {
        let msg = ChatMessage::tool_result("call_1", "{\"exit_code\":0}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn plain_message_serializes_without_tool_fields() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}

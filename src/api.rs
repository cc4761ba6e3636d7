//! Chat-completions request building and response parsing.
//!
//! One client, two jobs: assemble the payload (messages, model, token limit,
//! optional tool declarations) and interpret `choices[0].message` out of the
//! response. Tool-call follow-up rounds reuse the same entry point; the
//! recursion itself lives in [`crate::session`].

use crate::config::Config;
use crate::history::{ChatMessage, Role};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// A model-issued function invocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// JSON-encoded arguments, passed through verbatim from the API.
    pub arguments: String,
}

/// The parsed `choices[0].message` of a completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl AssistantReply {
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantReply,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Builds the request payload for one completion call.
pub fn build_payload(
    config: &Config,
    messages: &[ChatMessage],
    tools: Option<&[serde_json::Value]>,
) -> serde_json::Value {
    let mut payload = json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "messages": messages,
    });
    if let Some(tools) = tools {
        payload["tools"] = json!(tools);
        payload["tool_choice"] = json!("auto");
    }
    payload
}

/// Client for the chat-completions endpoint.
pub struct ChatClient {
    http: Box<dyn HttpClient>,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: Box::new(ReqwestHttpClient::with_timeout(config.timeout_secs)?),
        })
    }

    /// Creates a client over an injected transport (for testing).
    pub fn with_http(http: Box<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Issues one completion call and returns the parsed assistant message.
    pub async fn complete(
        &self,
        config: &Config,
        messages: &[ChatMessage],
        tools: Option<&[serde_json::Value]>,
    ) -> Result<AssistantReply> {
        if config.is_mock_mode() {
            info!("Using mock responder (LLMSH_USE_MOCK=1)");
            return Ok(mock_reply(messages, tools.is_some()));
        }

        let api_key = config.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No API key found. Please set it using one of these methods:\n\
                 \n\
                 1. Set API key in config:\n\
                    llmsh --set-api-key sk-your-key-here\n\
                 \n\
                 2. Set environment variable:\n\
                    export LLMSH_API_KEY=sk-your-key-here\n\
                 \n\
                 3. Check current config:\n\
                    llmsh --config"
            )
        })?;

        let payload = build_payload(config, messages, tools);
        let auth = format!("Bearer {}", api_key);
        let headers = [
            ("authorization", auth.as_str()),
            ("content-type", "application/json"),
        ];

        debug!("POST {} ({} messages)", config.endpoint, messages.len());
        let response = self.http.post_json(&config.endpoint, &headers, &payload).await?;

        if !response.is_success() {
            let detail = serde_json::from_str::<ApiErrorBody>(&response.body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| response.body.clone());
            return Err(anyhow!(
                "Chat API returned HTTP {}: {}",
                response.status,
                detail
            ));
        }

        parse_reply(&response.body)
    }
}

/// Extracts `choices[0].message` from a response body.
fn parse_reply(body: &str) -> Result<AssistantReply> {
    // An error object can arrive with a 200 from some proxies
    if let Ok(err) = serde_json::from_str::<ApiErrorBody>(body) {
        return Err(anyhow!("Chat API error: {}", err.error.message));
    }

    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        warn!("Unparseable completion response: {}", body);
        anyhow!("Failed to parse chat API response ({}). Raw response: {}", e, body)
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| anyhow!("Chat API response contained no choices. Raw response: {}", body))
}

/// Deterministic offline responder, keyed on prompt keywords.
///
/// Mirrors the real control flow: with tools enabled, a "count files" prompt
/// yields a tool call, and the round after a tool result yields a closing
/// summary. Everything else maps to a canned command line.
fn mock_reply(messages: &[ChatMessage], tools_enabled: bool) -> AssistantReply {
    let last = messages.last();

    if last.is_some_and(|m| m.role == Role::Tool) {
        let result = last.and_then(|m| m.content.clone()).unwrap_or_default();
        return AssistantReply {
            content: Some(format!("Mock summary of tool result: {}", result)),
            tool_calls: None,
        };
    }

    let prompt = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .and_then(|m| m.content.clone())
        .unwrap_or_default()
        .to_lowercase();

    if tools_enabled && prompt.contains("count files") {
        return AssistantReply {
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_mock_1".to_string(),
                kind: "function".to_string(),
                function: ToolCallFunction {
                    name: "execute".to_string(),
                    arguments: r#"{"command":"ls -1 | wc -l"}"#.to_string(),
                },
            }]),
        };
    }

    let command = if prompt.contains("disk") || prompt.contains("space") {
        "df -h".to_string()
    } else if prompt.contains("list") && prompt.contains("file") {
        "ls -la".to_string()
    } else if prompt.contains("time") || prompt.contains("date") {
        "date".to_string()
    } else if prompt.contains("memory") {
        "free -h".to_string()
    } else {
        format!("echo 'llmsh mock reply for: {}'", prompt)
    };

    AssistantReply {
        content: Some(command),
        tool_calls: None,
    }
}

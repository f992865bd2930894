//! Completion service trait and chat message types.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::tools::ToolSchema;

/// Chat message. Closed set of roles; every consumer matches exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        content: String,
    },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// Create an assistant message without tool calls
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying tool call requests
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool result message
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
        }
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::ToolResult { content, .. } => content,
            Message::Assistant { content, .. } => content,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Message::Human { .. })
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Message::Assistant { .. })
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Message::ToolResult { .. })
    }

    /// Tool call requests carried by an assistant message, empty otherwise.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            Message::System { .. } | Message::Human { .. } | Message::ToolResult { .. } => &[],
        }
    }
}

/// Tool call request from the completion service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Completion response
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Option<TokenUsage>,
}

/// Reason for completion
#[derive(Debug, Clone, PartialEq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    MaxTokens,
    Error,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: vec![],
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add tool schemas to the request
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*|\s*```").expect("valid code fence regex"));

/// Strip markdown code fences the model sometimes wraps JSON answers in.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_RE.replace_all(text.trim(), "").into_owned()
}

/// Completion service client
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;

    /// Complete a chat request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Single-prompt completion returning the plain text reply.
    async fn complete_text(&self, prompt: &str) -> Result<String> {
        let response = self
            .complete(CompletionRequest::new(vec![Message::human(prompt)]))
            .await?;
        Ok(response.content.unwrap_or_default())
    }

    /// Ask a yes/no question; anything other than a literal "yes" counts as no.
    async fn ask_yes_no(&self, prompt: &str) -> Result<bool> {
        let response = self
            .complete(CompletionRequest::new(vec![Message::human(prompt)]))
            .await?;
        let answer = response.content.unwrap_or_default();
        Ok(answer.trim().to_lowercase() == "yes")
    }

    /// Ask for a structured JSON judgment and parse the reply.
    async fn classify_json(&self, prompt: &str) -> Result<Value> {
        let response = self
            .complete(CompletionRequest::new(vec![Message::human(prompt)]))
            .await?;
        let content = response
            .content
            .ok_or_else(|| AgentError::Llm("Empty classification response".to_string()))?;
        let cleaned = strip_code_fences(&content);
        serde_json::from_str(&cleaned)
            .map_err(|e| AgentError::InvalidFormat(format!("Unparseable classification: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_roles_round_trip_as_tagged_json() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                id: "call-1".to_string(),
                name: "search_doctor_by_name".to_string(),
                arguments: serde_json::json!({"name": "김철수"}),
            }],
        );

        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains("\"role\":\"assistant\""));

        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.tool_calls().len(), 1);
        assert_eq!(decoded.tool_calls()[0].name, "search_doctor_by_name");
    }

    #[test]
    fn assistant_without_tool_calls_omits_the_field() {
        let encoded = serde_json::to_string(&Message::assistant("안녕하세요")).unwrap();
        assert!(!encoded.contains("tool_calls"));

        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.tool_calls().is_empty());
    }

    #[test]
    fn strip_code_fences_unwraps_json_blocks() {
        let wrapped = "```json\n{\"is_location\": true}\n```";
        assert_eq!(strip_code_fences(wrapped), "{\"is_location\": true}");
        assert_eq!(strip_code_fences("plain"), "plain");
    }
}

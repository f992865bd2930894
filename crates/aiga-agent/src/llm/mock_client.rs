//! Deterministic mock completion client for orchestration tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AgentError, Result};

use super::{CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, TokenUsage, ToolCall};

/// Deterministic step for scripted mock completions.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Return a plain assistant message.
    Text(String),
    /// Return a tool call response.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// Return an LLM error.
    Error(String),
    /// Return a content-policy rejection.
    ContentFilter(String),
    /// Return an unanswered-tool-call protocol rejection.
    ProtocolFault(String),
    /// Return a timeout-like error after optional delay.
    Timeout,
}

/// Scripted completion step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::ToolCall {
                id: id.into(),
                name: name.into(),
                arguments,
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn content_filter(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::ContentFilter(message.into()),
        }
    }

    pub fn protocol_fault(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::ProtocolFault(message.into()),
        }
    }

    pub fn timeout(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            kind: MockStepKind::Timeout,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock completion client driven by scripted steps.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    script: Arc<Mutex<VecDeque<MockStep>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<MockStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
        }
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    async fn next_step(&self) -> Option<MockStep> {
        self.script.lock().await.pop_front()
    }

    fn usage_for(content_len: usize) -> TokenUsage {
        let completion_tokens = content_len as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }

    fn fallback_response(request: &CompletionRequest) -> CompletionResponse {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| msg.is_human())
            .map(|msg| format!("mock-echo: {}", msg.content()))
            .unwrap_or_else(|| "mock-ok".to_string());

        CompletionResponse {
            content: Some(text.clone()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Some(Self::usage_for(text.len())),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let step = self.next_step().await;
        let Some(step) = step else {
            return Ok(Self::fallback_response(&request));
        };

        if step.delay_ms > 0 {
            sleep(Duration::from_millis(step.delay_ms)).await;
        }

        match step.kind {
            MockStepKind::Text(content) => Ok(CompletionResponse {
                usage: Some(Self::usage_for(content.len())),
                content: Some(content),
                tool_calls: Vec::new(),
                finish_reason: FinishReason::Stop,
            }),
            MockStepKind::ToolCall {
                id,
                name,
                arguments,
            } => Ok(CompletionResponse {
                usage: Some(Self::usage_for(0)),
                content: None,
                tool_calls: vec![ToolCall {
                    id,
                    name,
                    arguments,
                }],
                finish_reason: FinishReason::ToolCalls,
            }),
            MockStepKind::Error(message) => Err(AgentError::Llm(message)),
            MockStepKind::ContentFilter(message) => Err(AgentError::ContentFilter(message)),
            MockStepKind::ProtocolFault(message) => Err(AgentError::Protocol(message)),
            MockStepKind::Timeout => Err(AgentError::Llm("mock timeout".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionRequest, Message};

    #[tokio::test]
    async fn mock_client_returns_scripted_text() {
        let client = MockLlmClient::from_steps(vec![MockStep::text("안녕하세요")]);

        let response = client
            .complete(CompletionRequest::new(vec![Message::human("ping")]))
            .await
            .expect("mock response should succeed");

        assert_eq!(response.content.as_deref(), Some("안녕하세요"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn mock_client_returns_scripted_tool_call() {
        let client = MockLlmClient::from_steps(vec![MockStep::tool_call(
            "call-1",
            "search_doctor_by_name",
            serde_json::json!({"name": "김철수"}),
        )]);

        let response = client
            .complete(CompletionRequest::new(vec![Message::human("use tool")]))
            .await
            .expect("tool call response should succeed");

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "search_doctor_by_name");
    }

    #[tokio::test]
    async fn mock_client_echoes_last_human_message_when_script_is_empty() {
        let client = MockLlmClient::new();

        let response = client
            .complete(CompletionRequest::new(vec![Message::human("허리 아파요")]))
            .await
            .expect("fallback should succeed");

        assert_eq!(response.content.as_deref(), Some("mock-echo: 허리 아파요"));
    }

    #[tokio::test]
    async fn mock_client_surfaces_scripted_faults() {
        let client = MockLlmClient::from_steps(vec![
            MockStep::content_filter("filtered"),
            MockStep::protocol_fault("unanswered tool call"),
        ]);

        let first = client
            .complete(CompletionRequest::new(vec![Message::human("q")]))
            .await
            .unwrap_err();
        assert!(first.is_content_filter());

        let second = client
            .complete(CompletionRequest::new(vec![Message::human("q")]))
            .await
            .unwrap_err();
        assert!(second.is_protocol_fault());
    }
}

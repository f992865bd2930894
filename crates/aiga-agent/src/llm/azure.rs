//! Azure OpenAI completion provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, TokenUsage, ToolCall,
};

const DEFAULT_API_VERSION: &str = "2024-06-01";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const CONTENT_FILTER_MARKERS: [&str; 3] = [
    "content management policy",
    "content filter",
    "content_filter",
];

const PROTOCOL_FAULT_MARKERS: [&str; 2] = [
    "An assistant message with 'tool_calls' must be followed by tool messages",
    "tool_call_ids did not have response messages",
];

/// Azure OpenAI client. One deployment per client; no automatic retries,
/// recovery happens at the call site.
pub struct AzureOpenAiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl AzureOpenAiClient {
    /// Create a client for one Azure deployment.
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: build_http_client(DEFAULT_TIMEOUT_SECS),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Override the API version
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Override the request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.client = build_http_client(secs);
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    fn classify_failure(status: reqwest::StatusCode, body: &str) -> AgentError {
        let lowered = body.to_lowercase();
        if CONTENT_FILTER_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            return AgentError::ContentFilter(body.to_string());
        }
        if PROTOCOL_FAULT_MARKERS.iter().any(|m| body.contains(m))
            || (lowered.contains("invalid_request_error") && lowered.contains("tool_calls"))
        {
            return AgentError::Protocol(body.to_string());
        }
        AgentError::Llm(format!("Azure OpenAI error {status}: {body}"))
    }
}

#[derive(Serialize)]
struct AzureRequest {
    messages: Vec<AzureMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AzureTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct AzureMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<AzureMessageToolCall>>,
}

#[derive(Serialize)]
struct AzureMessageToolCall {
    id: String,
    r#type: String,
    function: AzureMessageFunction,
}

#[derive(Serialize)]
struct AzureMessageFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct AzureTool {
    r#type: String,
    function: AzureFunction,
}

#[derive(Serialize)]
struct AzureFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct AzureResponse {
    choices: Vec<AzureChoice>,
    usage: Option<AzureUsage>,
}

#[derive(Deserialize)]
struct AzureChoice {
    message: AzureResponseMessage,
    finish_reason: String,
}

#[derive(Deserialize)]
struct AzureResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<AzureToolCall>>,
}

#[derive(Deserialize)]
struct AzureToolCall {
    id: String,
    function: AzureFunctionCall,
}

#[derive(Deserialize)]
struct AzureFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Debug)]
struct AzureUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn to_wire_message(message: &Message) -> AzureMessage {
    match message {
        Message::System { content } => AzureMessage {
            role: "system".to_string(),
            content: Some(content.clone()),
            tool_call_id: None,
            tool_calls: None,
        },
        Message::Human { content } => AzureMessage {
            role: "user".to_string(),
            content: Some(content.clone()),
            tool_call_id: None,
            tool_calls: None,
        },
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let wire_calls = if tool_calls.is_empty() {
                None
            } else {
                Some(
                    tool_calls
                        .iter()
                        .map(|tc| AzureMessageToolCall {
                            id: tc.id.clone(),
                            r#type: "function".to_string(),
                            function: AzureMessageFunction {
                                name: tc.name.clone(),
                                arguments: serde_json::to_string(&tc.arguments)
                                    .unwrap_or_default(),
                            },
                        })
                        .collect(),
                )
            };

            // Content must be null when only tool calls are present
            let content = if wire_calls.is_some() && content.is_empty() {
                None
            } else {
                Some(content.clone())
            };

            AzureMessage {
                role: "assistant".to_string(),
                content,
                tool_call_id: None,
                tool_calls: wire_calls,
            }
        }
        Message::ToolResult { call_id, content } => AzureMessage {
            role: "tool".to_string(),
            content: Some(content.clone()),
            tool_call_id: Some(call_id.clone()),
            tool_calls: None,
        },
    }
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    fn provider(&self) -> &str {
        "azure_openai"
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let messages: Vec<AzureMessage> = request.messages.iter().map(to_wire_message).collect();

        let tools: Option<Vec<AzureTool>> = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| AzureTool {
                        r#type: "function".to_string(),
                        function: AzureFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let body = AzureRequest {
            messages,
            tools,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_failure(status, &body));
        }

        let data: AzureResponse = response.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Llm("No choices in Azure OpenAI response".to_string()))?;

        if choice.finish_reason == "content_filter" {
            return Err(AgentError::ContentFilter(
                "Azure has not provided the response due to a content filter being triggered"
                    .to_string(),
            ));
        }

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
            })
            .collect();

        let finish_reason = match choice.finish_reason.as_str() {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            "length" => FinishReason::MaxTokens,
            _ => FinishReason::Error,
        };

        let usage = data.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AzureOpenAiClient {
        AzureOpenAiClient::new(server.uri(), "gpt-4o", "test-key")
    }

    #[tokio::test]
    async fn complete_parses_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o/chat/completions"))
            .and(header("api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": "심장내과를 추천드립니다."},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 120, "completion_tokens": 24, "total_tokens": 144}
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::human(
                "가슴이 답답한데 어느 과를 가야 하나요?",
            )]))
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("심장내과를 추천드립니다."));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.unwrap().total_tokens, 144);
    }

    #[tokio::test]
    async fn complete_parses_tool_calls_with_string_arguments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call-1",
                            "type": "function",
                            "function": {
                                "name": "search_hospital_by_disease",
                                "arguments": "{\"disease\": \"녹내장\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::human(
                "녹내장 병원 알려줘",
            )]))
            .await
            .unwrap();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "search_hospital_by_disease");
        assert_eq!(response.tool_calls[0].arguments["disease"], "녹내장");
    }

    #[tokio::test]
    async fn content_policy_rejection_maps_to_content_filter_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                "The response was filtered due to the prompt triggering Azure OpenAI's content management policy",
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::human("질문")]))
            .await
            .unwrap_err();

        assert!(err.is_content_filter());
    }

    #[tokio::test]
    async fn unanswered_tool_call_rejection_maps_to_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                "An assistant message with 'tool_calls' must be followed by tool messages",
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::human("질문")]))
            .await
            .unwrap_err();

        assert!(err.is_protocol_fault());
    }

    #[tokio::test]
    async fn content_filter_finish_reason_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": null},
                    "finish_reason": "content_filter"
                }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::human("질문")]))
            .await
            .unwrap_err();

        assert!(err.is_content_filter());
    }
}

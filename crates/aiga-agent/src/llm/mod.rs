//! Completion service clients.

pub mod azure;
pub mod client;
pub mod mock_client;

pub use azure::AzureOpenAiClient;
pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, TokenUsage, ToolCall,
    strip_code_fences,
};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};

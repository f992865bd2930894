//! Error types for the agent orchestration layer.

use thiserror::Error;

/// Errors raised while driving a conversational turn.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Content policy rejection: {0}")]
    ContentFilter(String),

    #[error("Tool call pairing violated: {0}")]
    Protocol(String),

    #[error("Tool execution error: {0}")]
    Tool(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// True when the error carries a content-policy rejection from the
    /// completion service, which gets one sanitize-and-retry attempt.
    pub fn is_content_filter(&self) -> bool {
        matches!(self, AgentError::ContentFilter(_))
    }

    /// True for the "unanswered tool call" family of transport rejections.
    pub fn is_protocol_fault(&self) -> bool {
        matches!(self, AgentError::Protocol(_))
    }
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

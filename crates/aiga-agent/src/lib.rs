//! AIGA Agent - conversational turn engine for the medical guide service
//!
//! This crate provides:
//! - The turn controller (entry intents, agent loop, validation, checkpoints)
//! - Azure OpenAI completion client with fault classification
//! - Location context tracking and clarification for Korean place names
//! - Entity memory extracted from answers and tool results
//! - Transcript compaction (result externalization and rolling summaries)
//! - The tool dispatch seam used by the query capability crate

#![allow(dead_code)]

pub mod agent;
pub mod error;
mod http_client;
pub mod llm;
pub mod tools;

// Re-export commonly used types
pub use agent::{
    Coordinates, EntityMemory, Intent, KeywordClassifier, KeywordSanitizer, NominatimGeocoder,
    QueryClassifier, ReverseGeocoder, Sanitizer, Session, TurnConfig, TurnController, TurnResult,
    ValidationPolicy, ValidationVerdict,
};
pub use error::{AgentError, Result};
pub use llm::{
    AzureOpenAiClient, CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message,
    MockLlmClient, MockStep, TokenUsage, ToolCall,
};
pub use tools::{DispatchContext, Tool, ToolDispatcher, ToolOutput, ToolRegistry, ToolSchema};

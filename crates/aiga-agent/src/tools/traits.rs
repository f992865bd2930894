//! Query capability traits and the dispatch seam used by the turn controller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::agent::entity::EntityMemory;
use crate::agent::session::Coordinates;
use crate::error::Result;
use crate::llm::{LlmClient, Message, ToolCall};

/// Schema describing one query capability to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the capability parameters
    pub parameters: Value,
}

/// Output of a capability execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    /// Successful output carrying a result payload
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    /// Failed output with an error message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Render the payload the way it is appended to the transcript.
    pub fn content(&self) -> String {
        serde_json::to_string(&self.result).unwrap_or_else(|_| "null".to_string())
    }
}

/// One query capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Capability name as exposed to the completion service
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute with the given arguments
    async fn execute(&self, args: Value) -> Result<ToolOutput>;

    /// Build the schema advertised to the completion service
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Per-turn facts the router consults when rewriting or augmenting a call.
#[derive(Clone)]
pub struct DispatchContext {
    pub session_id: String,
    pub locale: String,
    pub coordinates: Option<Coordinates>,
    /// Most recent resolved place from the location history, rendered as text.
    pub resolved_location: Option<String>,
    /// Proximity classification for the current query.
    pub proximity: bool,
    pub entities: EntityMemory,
    /// Tail of the transcript used for secondary entity extraction.
    pub recent_messages: Vec<Message>,
    pub llm: Arc<dyn LlmClient>,
}

/// Routing seam between the turn controller and the query capabilities.
///
/// Implementations never propagate capability failures; a throwing capability
/// is converted into a structured error payload so the completion service
/// always receives a well-formed tool result.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Schemas for every capability the completion service may request.
    fn schemas(&self) -> Vec<ToolSchema>;

    /// Route one tool call and produce its result payload.
    async fn dispatch(&self, call: &ToolCall, ctx: &DispatchContext) -> ToolOutput;
}

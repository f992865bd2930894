//! The generic catch-all capability.
//!
//! The router rewrites `smart_search` calls into a precise capability when
//! the conversation carries enough structured entities. Direct execution
//! means nothing usable was extracted, so the user is asked to narrow the
//! request instead of running an unanchored scan.

use aiga_agent::{Result, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::general;

pub(crate) const COULD_NOT_FIND_MESSAGE: &str =
    "요청하신 조건에 맞는 병원/의사를 찾지 못했습니다. 찾으시는 지역이나 질환, 진료과를 조금 더 구체적으로 알려주시겠어요?";

#[derive(Debug, Deserialize)]
struct SmartSearchInput {
    #[serde(default)]
    question: Option<String>,
}

/// Free-form search request the router could not anchor.
#[derive(Debug, Default)]
pub struct SmartSearchTool;

impl SmartSearchTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for SmartSearchTool {
    fn name(&self) -> &str {
        "smart_search"
    }

    fn description(&self) -> &str {
        "다른 검색 도구로 표현하기 어려운 일반 검색 요청을 처리합니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "description": "사용자의 검색 요청 원문",
                    "type": "string"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: SmartSearchInput = serde_json::from_value(args)?;
        info!(
            question = input.question.as_deref().unwrap_or(""),
            "Smart search fell through without routable entities"
        );
        Ok(ToolOutput::success(general(
            COULD_NOT_FIND_MESSAGE.to_string(),
        )))
    }
}

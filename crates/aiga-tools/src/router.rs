//! Dispatch layer between the turn controller and the query catalog.
//!
//! The completion service only ever sees capability names and JSON arguments;
//! everything context-dependent happens here. Before a call reaches the
//! catalog the router may rewrite a `smart_search` into a concrete capability,
//! force the proximity flags from the session classification, or backfill a
//! missing department from the transcript. After execution it retries empty
//! answers through the disease-to-department mapping and stamps the sort hint
//! the frontend uses to order result cards.

use std::sync::Arc;

use aiga_agent::agent::compactor::CACHE_RESTORE_TOOL;
use aiga_agent::agent::entity::{extract_department_only, extract_route_entities};
use aiga_agent::agent::prompts::department_inference_prompt;
use aiga_agent::{DispatchContext, ToolCall, ToolDispatcher, ToolOutput, ToolRegistry, ToolSchema};
use aiga_storage::Storage;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::catalog::{self, COULD_NOT_FIND_MESSAGE, default_catalog};
use crate::dictionary;
use crate::store::DirectoryStore;

/// Capabilities that accept the proximity flags.
const PROXIMITY_TOOLS: [&str; 3] = [
    "search_doctors_by_location",
    "search_hospitals_by_location",
    "search_by_location_only",
];

const SMART_SEARCH_TOOL: &str = "smart_search";
const HOSPITAL_STAFF_TOOL: &str = "search_doctors_by_hospital_name";

/// Asked when a hospital staff lookup arrives without a department and none
/// can be recovered from the conversation.
const DEPARTMENT_QUESTION: &str =
    "어느 진료과 의료진을 찾으시는지 알려주시면 더 정확하게 안내해 드릴 수 있어요.";

/// Most departments tried during the empty-answer retry.
const RETRY_DEPARTMENT_LIMIT: usize = 3;

/// Routes tool calls from the completion service into the query catalog.
pub struct QueryRouter {
    registry: ToolRegistry,
    storage: Arc<Storage>,
}

impl QueryRouter {
    pub fn new(registry: ToolRegistry, storage: Arc<Storage>) -> Self {
        Self { registry, storage }
    }

    /// Router over the full query catalog backed by `store`.
    pub fn with_default_catalog(store: Arc<dyn DirectoryStore>, storage: Arc<Storage>) -> Self {
        Self::new(default_catalog(store), storage)
    }

    /// Replay a previously compacted tool result from the session cache.
    ///
    /// A miss never fails the call; the model gets a small error payload and
    /// can fall back to asking again.
    fn restore_cached(&self, session_id: &str, args: &Value) -> ToolOutput {
        let result_id = args
            .get("result_id")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match self.storage.result_cache.get(session_id, result_id) {
            Ok(Some(entry)) => {
                let payload = serde_json::from_str(&entry.content)
                    .unwrap_or_else(|_| Value::String(entry.content.clone()));
                ToolOutput::success(payload)
            }
            Ok(None) => {
                warn!(session_id, result_id, "cached tool result not found");
                ToolOutput::success(json!({"error": "Cache not found"}))
            }
            Err(e) => {
                warn!(session_id, result_id, error = %e, "tool result cache read failed");
                ToolOutput::success(json!({"error": "Cache not found"}))
            }
        }
    }

    /// Rewrite a `smart_search` call into the most specific capability the
    /// conversation supports. Falls through to `smart_search` itself when no
    /// entity survives extraction.
    async fn rewrite(&self, call: &ToolCall, ctx: &DispatchContext) -> (String, Value) {
        let entities = extract_route_entities(ctx.llm.as_ref(), &ctx.recent_messages).await;
        let doctors = entities.target != "병원";

        let location = entities.location.unwrap_or_default();
        let has_location = !location.trim().is_empty();
        let has_disease = !entities.diseases.is_empty();
        let has_department = !entities.departments.is_empty();

        let (name, args) = match (has_location, has_disease, has_department) {
            (true, true, true) => (
                location_tool(doctors),
                json!({
                    "location": location,
                    "disease": entities.diseases,
                    "department": entities.departments,
                }),
            ),
            (false, true, true) => (
                if doctors {
                    "search_doctors_by_disease_and_department"
                } else {
                    "search_hospital_by_disease_and_department"
                },
                json!({
                    "disease": entities.diseases,
                    "department": entities.departments,
                }),
            ),
            (true, false, true) => (
                location_tool(doctors),
                json!({
                    "location": location,
                    "department": entities.departments,
                }),
            ),
            (true, true, false) => (
                location_tool(doctors),
                json!({
                    "location": location,
                    "disease": entities.diseases,
                }),
            ),
            (true, false, false) => (
                "search_by_location_only",
                json!({
                    "location": location,
                    "target": entities.target,
                }),
            ),
            (false, true, false) => (
                if doctors {
                    "search_doctors_by_disease_only"
                } else {
                    "search_hospitals_by_disease_only"
                },
                json!({"disease": entities.diseases}),
            ),
            (false, false, true) => (
                if doctors {
                    "search_doctors_by_department_only"
                } else {
                    "search_hospitals_by_department_only"
                },
                json!({"department": entities.departments}),
            ),
            (false, false, false) => {
                info!("smart_search rewrite found no entities, keeping original call");
                return (call.name.clone(), call.arguments.clone());
            }
        };

        info!(from = %call.name, to = name, "rewrote smart search");
        (name.to_string(), args)
    }

    /// Overwrite the proximity flags from the session classification.
    ///
    /// The model routinely guesses `is_nearby` wrong, so the classified value
    /// always wins. Coordinates are only filled in when absent, so an explicit
    /// place mentioned by the model survives.
    fn force_proximity(&self, name: &str, args: &mut Value, ctx: &DispatchContext) {
        if !PROXIMITY_TOOLS.contains(&name) {
            return;
        }
        let Some(map) = args.as_object_mut() else {
            return;
        };

        map.insert("is_nearby".to_string(), Value::Bool(ctx.proximity));

        if ctx.proximity {
            if let Some(coords) = &ctx.coordinates {
                map.entry("latitude".to_string())
                    .or_insert_with(|| json!(coords.latitude));
                map.entry("longitude".to_string())
                    .or_insert_with(|| json!(coords.longitude));
            }
        }
    }

    /// Make sure a hospital staff lookup carries a department, recovering one
    /// from the transcript when the model omitted it. Returns false when none
    /// can be found and the user has to be asked.
    async fn ensure_department(&self, args: &mut Value, ctx: &DispatchContext) -> bool {
        if department_present(args.get("department")) {
            return true;
        }

        let recovered =
            extract_department_only(ctx.llm.as_ref(), &ctx.recent_messages, &ctx.entities).await;
        match recovered {
            Some(department) => {
                info!(department, "backfilled department for hospital staff lookup");
                if let Some(map) = args.as_object_mut() {
                    map.insert("department".to_string(), Value::String(department));
                }
                true
            }
            None => false,
        }
    }

    /// Run a capability and convert any failure into an error payload.
    async fn execute(&self, name: &str, args: Value) -> ToolOutput {
        match self.registry.execute(name, args).await {
            Ok(output) => output,
            Err(e) => {
                error!(tool = name, error = %e, "capability execution failed");
                ToolOutput::success(catalog::fault(format!(
                    "데이터베이스 조회 중 오류가 발생했습니다: {e}"
                )))
            }
        }
    }

    /// Retry an empty answer through the disease-to-department mapping.
    ///
    /// A disease query that finds nobody usually means no doctor lists that
    /// exact term in their specialties. The departments treating the disease
    /// are looked up (static table first, then inference) and the search is
    /// repeated per department, location-aware when the session has one.
    async fn recover_empty(
        &self,
        name: &str,
        args: &Value,
        output: ToolOutput,
        ctx: &DispatchContext,
    ) -> ToolOutput {
        if !empty_answer(&output.result) {
            return output;
        }

        let mut diseases = string_values(args.get("disease"));
        if diseases.is_empty() {
            diseases = ctx.entities.diseases.clone();
        }
        if diseases.is_empty() {
            info!(tool = name, "empty answer with no disease to retry on");
            return could_not_find();
        }

        let mut departments: Vec<String> = Vec::new();
        for disease in &diseases {
            for department in dictionary::departments_for_disease(disease) {
                if !departments.contains(&department) {
                    departments.push(department);
                }
            }
        }
        departments.truncate(RETRY_DEPARTMENT_LIMIT);

        if departments.is_empty() {
            departments = self.infer_departments(&diseases, ctx).await;
        }
        if departments.is_empty() {
            info!(tool = name, "no department mapping for retry");
            return could_not_find();
        }

        let hospitals = output
            .result
            .get("chat_type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == "recommand_hospital");

        // Without a place or usable coordinates the location capabilities
        // would come back empty-handed, so retry unscoped instead.
        let has_area =
            ctx.resolved_location.is_some() || (ctx.proximity && ctx.coordinates.is_some());
        let (retry_name, retry_args) = if has_area {
            let mut map = Map::new();
            map.insert("department".to_string(), json!(departments));
            map.insert("is_nearby".to_string(), Value::Bool(ctx.proximity));
            if let Some(place) = &ctx.resolved_location {
                map.insert("location".to_string(), Value::String(place.clone()));
            }
            if let Some(coords) = &ctx.coordinates {
                map.insert("latitude".to_string(), json!(coords.latitude));
                map.insert("longitude".to_string(), json!(coords.longitude));
            }
            let retry_name = if hospitals {
                "search_hospitals_by_location"
            } else {
                "search_doctors_by_location"
            };
            (retry_name, Value::Object(map))
        } else {
            let retry_name = if hospitals {
                "search_hospitals_by_department_only"
            } else {
                "search_doctors_by_department_only"
            };
            (retry_name, json!({"department": departments}))
        };

        info!(
            from = name,
            to = retry_name,
            ?departments,
            "retrying empty answer via department mapping"
        );
        let second = self.execute(retry_name, retry_args).await;

        let failed = second
            .result
            .get("chat_type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == "error");
        if failed || empty_answer(&second.result) {
            return could_not_find();
        }
        second
    }

    /// Ask the completion service which departments treat the given diseases.
    /// First parseable answer wins.
    async fn infer_departments(&self, diseases: &[String], ctx: &DispatchContext) -> Vec<String> {
        for disease in diseases {
            let prompt = department_inference_prompt(disease);
            match ctx.llm.classify_json(&prompt).await {
                Ok(parsed) => {
                    let departments = string_values(parsed.get("departments"));
                    if !departments.is_empty() {
                        let mut departments = departments;
                        departments.truncate(RETRY_DEPARTMENT_LIMIT);
                        return departments;
                    }
                }
                Err(e) => {
                    warn!(disease, error = %e, "department inference failed");
                }
            }
        }
        Vec::new()
    }

    /// Stamp the frontend sort hint onto a successful answer payload.
    fn finalize(&self, mut output: ToolOutput, ctx: &DispatchContext) -> ToolOutput {
        let sort = if ctx.proximity {
            "distance"
        } else {
            "evaluation"
        };
        if let Some(map) = output.result.as_object_mut() {
            let is_error = map
                .get("chat_type")
                .and_then(Value::as_str)
                .is_some_and(|t| t == "error");
            if !is_error {
                map.insert("front_sort_type".to_string(), Value::String(sort.to_string()));
            }
        }
        output
    }
}

#[async_trait]
impl ToolDispatcher for QueryRouter {
    fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas = self.registry.schemas();
        schemas.push(cache_restore_schema());
        schemas
    }

    async fn dispatch(&self, call: &ToolCall, ctx: &DispatchContext) -> ToolOutput {
        if call.name == CACHE_RESTORE_TOOL {
            // Replayed verbatim; the original already carried its sort hint.
            return self.restore_cached(&ctx.session_id, &call.arguments);
        }

        let (name, mut args) = if call.name == SMART_SEARCH_TOOL {
            self.rewrite(call, ctx).await
        } else {
            (call.name.clone(), call.arguments.clone())
        };

        self.force_proximity(&name, &mut args, ctx);

        if name == HOSPITAL_STAFF_TOOL && !self.ensure_department(&mut args, ctx).await {
            let output = ToolOutput::success(catalog::general(DEPARTMENT_QUESTION.to_string()));
            return self.finalize(output, ctx);
        }

        let output = self.execute(&name, args.clone()).await;
        let output = self.recover_empty(&name, &args, output, ctx).await;
        self.finalize(output, ctx)
    }
}

fn cache_restore_schema() -> ToolSchema {
    ToolSchema {
        name: CACHE_RESTORE_TOOL.to_string(),
        description: "이전 대화에서 캐시된 검색 결과를 다시 불러옵니다. 대화 기록에 표시된 result_id를 그대로 전달하세요.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "result_id": {
                    "type": "string",
                    "description": "복원할 결과의 식별자"
                }
            },
            "required": ["result_id"]
        }),
    }
}

fn location_tool(doctors: bool) -> &'static str {
    if doctors {
        "search_doctors_by_location"
    } else {
        "search_hospitals_by_location"
    }
}

fn department_present(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => items
            .iter()
            .any(|v| v.as_str().is_some_and(|s| !s.trim().is_empty())),
        _ => false,
    }
}

fn string_values(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// True when the payload carries a doctor or hospital list and it is empty.
fn empty_answer(result: &Value) -> bool {
    let Some(answer) = result.get("answer") else {
        return false;
    };
    for key in ["doctors", "hospitals"] {
        if let Some(items) = answer.get(key).and_then(Value::as_array) {
            return items.is_empty();
        }
    }
    false
}

fn could_not_find() -> ToolOutput {
    ToolOutput::success(catalog::general(COULD_NOT_FIND_MESSAGE.to_string()))
}

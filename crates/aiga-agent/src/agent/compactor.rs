//! Transcript compaction.
//!
//! Two mechanisms keep long conversations inside the context window. Tool
//! results older than the current turn move out to the result cache and
//! leave a one-line placeholder behind, and the newest placeholders get a
//! compact name excerpt folded back in so recall survives the move. Past a
//! character threshold the older transcript collapses into a rolling
//! narrative summary.

use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::prompts::{self, MIGRATED_PLACEHOLDER, SUMMARY_PREFIX};
use crate::agent::transcript;
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, Message, TokenUsage, ToolCall};
use aiga_storage::Storage;

/// Tool name the model uses to pull an externalized result back inline.
pub const CACHE_RESTORE_TOOL: &str = "get_cached_tool_result";

/// Move every tool result older than the current turn into the result cache,
/// replacing it with a `migrated` placeholder. Already-migrated and
/// enriched messages are skipped, so the pass is idempotent.
pub fn externalize_tool_results(
    storage: &Storage,
    session_id: &str,
    messages: &[Message],
) -> Vec<Message> {
    let mut out = messages.to_vec();

    // The dispatch that just ran appended a run of fresh results; those stay
    // inline for the model call this turn.
    let mut protected_from = out.len();
    if matches!(out.last(), Some(Message::ToolResult { .. })) {
        let mut start = out.len();
        while start > 0 && out[start - 1].is_tool_result() {
            start -= 1;
        }
        if start > 0 && out[start - 1].is_assistant() && !out[start - 1].tool_calls().is_empty() {
            protected_from = start;
        }
    }

    for (i, msg) in out.iter_mut().enumerate() {
        if i >= protected_from {
            continue;
        }
        let Message::ToolResult { content, .. } = msg else {
            continue;
        };
        let Ok(parsed) = serde_json::from_str::<Value>(content) else {
            continue;
        };
        if !parsed.is_object()
            || parsed.get("migrated").and_then(Value::as_bool) == Some(true)
            || parsed.get("is_historical_context").and_then(Value::as_bool) == Some(true)
        {
            continue;
        }

        let result_id = Uuid::new_v4().to_string();
        if let Err(e) = storage.result_cache.put(session_id, &result_id, content) {
            warn!(error = %e, "Failed to externalize tool result, keeping it inline");
            continue;
        }

        let (summary, param) = migration_summary(&parsed);
        info!(result_id = %result_id, summary = %summary, "Tool result externalized");
        *content = json!({
            "migrated": true,
            "result_id": result_id,
            "summary": summary,
            "param": param,
        })
        .to_string();
    }

    out
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// One-line summary and retrieval parameters for a migrated placeholder.
fn migration_summary(parsed: &Value) -> (String, Value) {
    let mut summary = MIGRATED_PLACEHOLDER.to_string();
    let mut param = serde_json::Map::new();

    let Some(chat_type) = parsed.get("chat_type") else {
        return (summary, Value::Object(param));
    };
    let chat_type = chat_type
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| chat_type.to_string());

    match parsed.get("answer") {
        Some(Value::Object(answer)) => {
            let mut parts = Vec::new();

            if let Some(disease) = non_empty_str(answer.get("disease")) {
                parts.push(format!("질환: {disease}"));
                param.insert("disease".to_string(), Value::String(disease.to_string()));
            }
            if let Some(department) = non_empty_str(answer.get("department")) {
                parts.push(format!("진료과: {department}"));
                param.insert(
                    "department".to_string(),
                    Value::String(department.to_string()),
                );
            }

            let hospital_count = answer
                .get("hospitals")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if let Some(hospital) = non_empty_str(answer.get("hospital")) {
                parts.push(format!("병원: {hospital}"));
                param.insert("hospital".to_string(), Value::String(hospital.to_string()));
            } else if hospital_count > 0 {
                let first = answer["hospitals"][0]
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if !first.is_empty() {
                    parts.push(format!("주요 병원: {first}"));
                }
                param.insert("hospital".to_string(), Value::String(first.to_string()));
                param.insert("hospital_count".to_string(), Value::from(hospital_count));
            }

            let doctor_count = answer
                .get("doctors")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if doctor_count > 0 {
                let first = answer["doctors"][0]
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if !first.is_empty() {
                    parts.push(format!("주요 의사: {first}"));
                }
                param.insert("doctor".to_string(), Value::String(first.to_string()));
                param.insert("doctor_count".to_string(), Value::from(doctor_count));
            }

            let count_info = if doctor_count > 0 {
                format!("{doctor_count}명의 의사 정보")
            } else if hospital_count > 0 {
                format!("{hospital_count}개의 병원 정보")
            } else {
                String::new()
            };

            if !parts.is_empty() || !count_info.is_empty() {
                summary = format!(
                    "과거 {chat_type} 결과: {count_info}{}",
                    if parts.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", parts.join(", "))
                    }
                );
            }
        }
        Some(Value::String(answer)) => {
            let prefix: String = answer.chars().take(100).collect();
            summary = format!("과거 {chat_type} 결과: {prefix}... (저장됨)");
        }
        _ => {}
    }

    (summary, Value::Object(param))
}

/// Fold a compact excerpt of the cached payload back into the newest
/// migrated placeholders, up to `limit` of them. Enriched placeholders are
/// marked so neither pass touches them again.
pub fn enrich_recent_placeholders(
    storage: &Storage,
    session_id: &str,
    messages: &[Message],
    limit: usize,
) -> Vec<Message> {
    let mut out = messages.to_vec();
    let mut enriched = 0usize;

    for msg in out.iter_mut().rev() {
        if enriched >= limit {
            break;
        }
        let Message::ToolResult { content, .. } = msg else {
            continue;
        };
        let Ok(mut placeholder) = serde_json::from_str::<Value>(content) else {
            continue;
        };
        if placeholder.get("migrated").and_then(Value::as_bool) != Some(true)
            || placeholder.get("is_historical_context").and_then(Value::as_bool) == Some(true)
        {
            continue;
        }
        let Some(result_id) = placeholder
            .get("result_id")
            .and_then(Value::as_str)
            .map(String::from)
        else {
            continue;
        };

        let cached = match storage.result_cache.get(session_id, &result_id) {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                warn!(result_id = %result_id, "No cached payload for placeholder enrichment");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Result cache lookup failed during enrichment");
                continue;
            }
        };

        let excerpt = serde_json::from_str::<Value>(&cached.content)
            .map(|original| historical_excerpt(&original))
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        if let Some(obj) = placeholder.as_object_mut() {
            obj.insert("is_historical_context".to_string(), Value::Bool(true));
            if excerpt.as_object().is_some_and(|e| !e.is_empty()) {
                obj.insert("excerpt".to_string(), excerpt);
            }
        }
        *content = placeholder.to_string();
        enriched += 1;
    }

    if enriched > 0 {
        info!(enriched, "Enriched migrated placeholders with excerpts");
    }
    out
}

/// Names and context worth keeping inline after externalization.
fn historical_excerpt(original: &Value) -> Value {
    let mut excerpt = serde_json::Map::new();
    let answer = original.get("answer");

    for (key, list_key) in [("doctors", "doctors"), ("hospitals", "hospitals")] {
        let names: Vec<Value> = answer
            .and_then(|a| a.get(list_key))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .filter(|name| !name.is_empty())
                    .map(|name| Value::String(name.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        if !names.is_empty() {
            excerpt.insert(key.to_string(), Value::Array(names));
        }
    }
    for key in ["disease", "department"] {
        if let Some(value) = answer.and_then(|a| non_empty_str(a.get(key))) {
            excerpt.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    Value::Object(excerpt)
}

/// Resolve internal cache-restoration calls into tool results. A missing
/// entry answers with a fixed error payload so call pairing stays intact.
pub fn restore_cached_results(
    storage: &Storage,
    session_id: &str,
    calls: &[ToolCall],
) -> Vec<Message> {
    calls
        .iter()
        .map(|call| {
            let result_id = call.arguments.get("result_id").and_then(Value::as_str);
            let content = result_id.and_then(|id| match storage.result_cache.get(session_id, id) {
                Ok(Some(cached)) => Some(cached.content),
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "Result cache lookup failed");
                    None
                }
            });
            match content {
                Some(content) => {
                    info!(result_id = ?result_id, "Restored cached tool result");
                    Message::tool_result(call.id.clone(), content)
                }
                None => {
                    warn!(result_id = ?result_id, "Cache not found for restoration call");
                    Message::tool_result(call.id.clone(), r#"{"error": "Cache not found"}"#)
                }
            }
        })
        .collect()
}

/// Collapse the older transcript into a rolling narrative summary once the
/// character count passes the threshold.
///
/// The split point sits before the most recent tool-call/result pair so the
/// model keeps the structured context it is still working from; with no tool
/// traffic the last `keep_tail` messages survive. Prior summary text
/// accumulates, newest line last.
pub async fn summarize_if_needed(
    llm: &dyn LlmClient,
    messages: &[Message],
    char_threshold: usize,
    keep_tail: usize,
) -> Result<(Vec<Message>, TokenUsage)> {
    let char_count = transcript::content_char_count(messages);
    if char_count <= char_threshold {
        return Ok((messages.to_vec(), TokenUsage::default()));
    }
    info!(
        char_count,
        char_threshold, "Transcript over threshold, summarizing"
    );

    let (system, body): (Message, &[Message]) = match messages.first() {
        Some(m) if m.is_system() => (m.clone(), &messages[1..]),
        _ => (Message::system(prompts::SYSTEM_PROMPT), messages),
    };

    // Prior summary splits the transcript into already-summarized and new.
    let summary_marker = format!("{SUMMARY_PREFIX}\n");
    let last_summary = body
        .iter()
        .rposition(|m| m.is_human() && m.content().starts_with(SUMMARY_PREFIX));
    let (old_summary, since): (String, &[Message]) = match last_summary {
        Some(idx) => {
            let text = body[idx]
                .content()
                .strip_prefix(&summary_marker)
                .or_else(|| body[idx].content().strip_prefix(SUMMARY_PREFIX))
                .unwrap_or_default()
                .to_string();
            (text, &body[idx + 1..])
        }
        None => (String::new(), body),
    };

    let last_tool = since.iter().rposition(|m| m.is_tool_result());
    let (to_summarize, to_keep): (&[Message], &[Message]) = match last_tool {
        Some(idx)
            if idx > 0 && since[idx - 1].is_assistant() && !since[idx - 1].tool_calls().is_empty() =>
        {
            (&since[..idx - 1], &since[idx - 1..])
        }
        Some(idx) => (&since[..idx], &since[idx..]),
        None if since.len() > keep_tail => {
            let cut = since.len() - keep_tail;
            (&since[..cut], &since[cut..])
        }
        None => (&[][..], since),
    };

    if to_summarize.is_empty() {
        return Ok((messages.to_vec(), TokenUsage::default()));
    }

    let narrative = render_narrative(to_summarize);
    let prompt = prompts::summary_prompt(&narrative);
    let response = llm
        .complete(CompletionRequest::new(vec![Message::human(prompt)]))
        .await?;
    let snippet = response.content.unwrap_or_default().trim().to_string();
    let usage = response.usage.unwrap_or_default();

    let mut final_summary = old_summary;
    if !snippet.is_empty() {
        if final_summary.is_empty() {
            final_summary = snippet;
        } else {
            final_summary.push('\n');
            final_summary.push_str(&snippet);
        }
    }

    let mut rebuilt = Vec::with_capacity(to_keep.len() + 2);
    rebuilt.push(system);
    rebuilt.push(Message::human(format!("{SUMMARY_PREFIX}\n{final_summary}")));
    rebuilt.extend(to_keep.iter().cloned());
    info!(
        summarized = to_summarize.len(),
        kept = to_keep.len(),
        "Compacted transcript with rolling summary"
    );
    Ok((rebuilt, usage))
}

/// Render messages as the narrative timeline fed to the summary prompt.
fn render_narrative(messages: &[Message]) -> String {
    let mut lines = Vec::with_capacity(messages.len());
    for msg in messages {
        match msg {
            Message::Human { content } => lines.push(format!("사용자: {content}")),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                if let Some(call) = tool_calls.first() {
                    lines.push(format!("AI: ({} 도구 사용) {content}", call.name));
                } else {
                    lines.push(format!("AI: {content}"));
                }
            }
            Message::ToolResult { content, .. } => lines.push(render_tool_line(content)),
            Message::System { .. } => {}
        }
    }
    lines.join("\n")
}

fn render_tool_line(content: &str) -> String {
    let Ok(data) = serde_json::from_str::<Value>(content) else {
        return format!("[도구 오류: {content}]");
    };
    let answer = data.get("answer");

    let list = answer
        .and_then(|a| a.get("doctors"))
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .or_else(|| {
            answer
                .and_then(|a| a.get("hospitals"))
                .and_then(Value::as_array)
                .filter(|items| !items.is_empty())
        });
    if let Some(items) = list {
        let parts: Vec<String> = items
            .iter()
            .map(|item| {
                format!(
                    "[{}/{}/{}]",
                    item.get("name").and_then(Value::as_str).unwrap_or(""),
                    item.get("hospital").and_then(Value::as_str).unwrap_or(""),
                    item.get("deptname").and_then(Value::as_str).unwrap_or(""),
                )
            })
            .collect();
        return format!("도구 결과: {}", parts.join(", "));
    }
    if let Some(answer_text) = answer.and_then(Value::as_str) {
        return format!("도구 결과: [{answer_text}]");
    }
    "도구 결과: [데이터]".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockStep};
    use tempfile::tempdir;

    fn test_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aiga.db");
        let storage = Storage::new(path.to_str().unwrap()).unwrap();
        (dir, storage)
    }

    fn doctor_result() -> String {
        json!({
            "chat_type": "recommand_doctor",
            "answer": {
                "disease": "간암",
                "doctors": [
                    {"name": "김철수", "hospital": "서울병원", "deptname": "소화기내과"},
                    {"name": "이영희", "hospital": "부산병원", "deptname": "외과"}
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn fresh_results_stay_inline() {
        let (_dir, storage) = test_storage();
        let messages = vec![
            Message::human("간암 명의 알려줘"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "c1".to_string(),
                    name: "getRecommandDoctors".to_string(),
                    arguments: json!({}),
                }],
            ),
            Message::tool_result("c1", doctor_result()),
        ];

        let out = externalize_tool_results(&storage, "s1", &messages);
        assert_eq!(out[2].content(), doctor_result());
        assert_eq!(storage.result_cache.count().unwrap(), 0);
    }

    #[test]
    fn old_results_migrate_with_summary_and_cache_entry() {
        let (_dir, storage) = test_storage();
        let messages = vec![
            Message::human("간암 명의 알려줘"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "c1".to_string(),
                    name: "getRecommandDoctors".to_string(),
                    arguments: json!({}),
                }],
            ),
            Message::tool_result("c1", doctor_result()),
            Message::assistant("김철수 교수를 추천드립니다."),
            Message::human("그 분 어느 병원이야?"),
        ];

        let out = externalize_tool_results(&storage, "s1", &messages);

        let migrated: Value = serde_json::from_str(out[2].content()).unwrap();
        assert_eq!(migrated["migrated"], Value::Bool(true));
        let summary = migrated["summary"].as_str().unwrap();
        assert!(summary.contains("과거 recommand_doctor 결과"));
        assert!(summary.contains("2명의 의사 정보"));
        assert!(summary.contains("질환: 간암"));
        assert!(summary.contains("주요 의사: 김철수"));
        assert_eq!(migrated["param"]["doctor_count"], Value::from(2));

        let result_id = migrated["result_id"].as_str().unwrap();
        let cached = storage.result_cache.get("s1", result_id).unwrap().unwrap();
        assert_eq!(cached.content, doctor_result());

        // Second pass leaves the placeholder alone.
        let again = externalize_tool_results(&storage, "s1", &out);
        assert_eq!(again[2].content(), out[2].content());
        assert_eq!(storage.result_cache.count().unwrap(), 1);
    }

    #[test]
    fn string_answers_summarize_with_a_prefix() {
        let (_dir, storage) = test_storage();
        let content = json!({
            "chat_type": "general",
            "answer": "지역 정보를 찾을 수 없습니다."
        })
        .to_string();
        let messages = vec![
            Message::tool_result("c1", content),
            Message::assistant("죄송합니다."),
            Message::human("다시"),
        ];

        let out = externalize_tool_results(&storage, "s1", &messages);
        let migrated: Value = serde_json::from_str(out[0].content()).unwrap();
        assert_eq!(
            migrated["summary"].as_str().unwrap(),
            "과거 general 결과: 지역 정보를 찾을 수 없습니다.... (저장됨)"
        );
    }

    #[test]
    fn enrichment_pulls_names_back_and_marks_the_placeholder() {
        let (_dir, storage) = test_storage();
        let messages = vec![
            Message::tool_result("c1", doctor_result()),
            Message::assistant("추천드립니다."),
            Message::human("다른 질문"),
        ];

        let externalized = externalize_tool_results(&storage, "s1", &messages);
        let enriched = enrich_recent_placeholders(&storage, "s1", &externalized, 10);

        let payload: Value = serde_json::from_str(enriched[0].content()).unwrap();
        assert_eq!(payload["is_historical_context"], Value::Bool(true));
        assert_eq!(payload["excerpt"]["doctors"], json!(["김철수", "이영희"]));
        assert_eq!(payload["excerpt"]["disease"], json!("간암"));

        // Neither pass touches an enriched placeholder again.
        let second = enrich_recent_placeholders(&storage, "s1", &enriched, 10);
        assert_eq!(second[0].content(), enriched[0].content());
        let third = externalize_tool_results(&storage, "s1", &second);
        assert_eq!(third[0].content(), enriched[0].content());
        assert_eq!(storage.result_cache.count().unwrap(), 1);
    }

    #[test]
    fn restoration_answers_every_call() {
        let (_dir, storage) = test_storage();
        storage
            .result_cache
            .put("s1", "known-id", r#"{"chat_type":"x"}"#)
            .unwrap();

        let calls = vec![
            ToolCall {
                id: "c1".to_string(),
                name: CACHE_RESTORE_TOOL.to_string(),
                arguments: json!({"result_id": "known-id"}),
            },
            ToolCall {
                id: "c2".to_string(),
                name: CACHE_RESTORE_TOOL.to_string(),
                arguments: json!({"result_id": "missing-id"}),
            },
        ];

        let results = restore_cached_results(&storage, "s1", &calls);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content(), r#"{"chat_type":"x"}"#);
        assert_eq!(results[1].content(), r#"{"error": "Cache not found"}"#);
    }

    #[tokio::test]
    async fn short_transcripts_pass_through_unsummarized() {
        let llm = MockLlmClient::new();
        let messages = vec![
            Message::system("상담사"),
            Message::human("안녕"),
            Message::assistant("안녕하세요"),
        ];
        let (out, usage) = summarize_if_needed(&llm, &messages, 5000, 4).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(usage.total_tokens, 0);
    }

    #[tokio::test]
    async fn long_transcripts_collapse_into_a_rolling_summary() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text(
            "사용자의 간암 명의 요청에 따라 AI가 김철수 교수를 안내함.",
        )]);
        let filler = "아".repeat(3000);
        let messages = vec![
            Message::system("상담사"),
            Message::human(filler.clone()),
            Message::assistant(filler),
            Message::human("간암 명의 알려줘"),
            Message::assistant("김철수 교수를 추천드립니다."),
            Message::human("어느 병원이야?"),
            Message::assistant("서울병원입니다."),
        ];

        let (out, usage) = summarize_if_needed(&llm, &messages, 5000, 4).await.unwrap();

        assert!(out[0].is_system());
        assert!(out[1].is_human());
        assert!(out[1].content().starts_with(SUMMARY_PREFIX));
        assert!(out[1].content().contains("김철수 교수를 안내함"));
        // Last four messages survive untouched.
        assert_eq!(out.len(), 6);
        assert_eq!(out[2].content(), "간암 명의 알려줘");
        assert!(usage.total_tokens > 0);
    }

    #[tokio::test]
    async fn summary_split_keeps_the_latest_tool_pair() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text("과거 대화 요약.")]);
        let filler = "아".repeat(6000);
        let call = ToolCall {
            id: "c1".to_string(),
            name: "getRecommandDoctors".to_string(),
            arguments: json!({}),
        };
        let messages = vec![
            Message::system("상담사"),
            Message::human(filler),
            Message::assistant("네"),
            Message::human("간암 명의 알려줘"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool_result("c1", doctor_result()),
            Message::assistant("김철수 교수를 추천드립니다."),
        ];

        let (out, _) = summarize_if_needed(&llm, &messages, 5000, 4).await.unwrap();

        // [system, summary, assistant(tool_calls), tool_result, assistant]
        assert_eq!(out.len(), 5);
        assert!(out[1].content().starts_with(SUMMARY_PREFIX));
        assert!(!out[2].tool_calls().is_empty());
        assert!(out[3].is_tool_result());
    }

    #[tokio::test]
    async fn summaries_accumulate_across_passes() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text("두번째 요약.")]);
        let filler = "아".repeat(6000);
        let messages = vec![
            Message::system("상담사"),
            Message::human(format!("{SUMMARY_PREFIX}\n첫번째 요약.")),
            Message::human(filler),
            Message::assistant("네"),
            Message::human("최근 질문"),
            Message::assistant("최근 답변"),
            Message::human("마지막 질문"),
        ];

        let (out, _) = summarize_if_needed(&llm, &messages, 5000, 4).await.unwrap();

        let summary = out[1].content();
        assert!(summary.contains("첫번째 요약."));
        assert!(summary.contains("두번째 요약."));
        let first = summary.find("첫번째").unwrap();
        let second = summary.find("두번째").unwrap();
        assert!(first < second);
    }

    #[test]
    fn narrative_renders_each_role() {
        let call = ToolCall {
            id: "c1".to_string(),
            name: "getRecommandDoctors".to_string(),
            arguments: json!({}),
        };
        let messages = vec![
            Message::human("간암 명의 알려줘"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool_result("c1", doctor_result()),
            Message::tool_result("c2", json!({"answer": "결과 없음"}).to_string()),
            Message::tool_result("c3", "not json"),
        ];

        let narrative = render_narrative(&messages);
        assert!(narrative.contains("사용자: 간암 명의 알려줘"));
        assert!(narrative.contains("AI: (getRecommandDoctors 도구 사용)"));
        assert!(narrative.contains("도구 결과: [김철수/서울병원/소화기내과], [이영희/부산병원/외과]"));
        assert!(narrative.contains("도구 결과: [결과 없음]"));
        assert!(narrative.contains("[도구 오류: not json]"));
    }
}

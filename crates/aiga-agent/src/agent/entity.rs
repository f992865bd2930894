//! Entity memory and extraction.
//!
//! Confirmed hospitals, doctors, departments and diseases accumulate across
//! turns and feed both the system prompt and the routing rewrite. Extraction
//! is model-driven; a failed call degrades to an empty snapshot instead of
//! failing the turn.

use crate::agent::prompts;
use crate::agent::transcript;
use crate::llm::{LlmClient, Message};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// How many recent messages feed the extraction prompts.
const EXTRACTION_HISTORY_LIMIT: usize = 10;

/// A doctor the conversation has touched, deduplicated by (name, hospital).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorRef {
    pub name: String,
    pub hospital: Option<String>,
    pub department: Option<String>,
}

/// Entities confirmed so far in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMemory {
    pub hospitals: Vec<String>,
    pub doctors: Vec<DoctorRef>,
    pub departments: Vec<String>,
    pub diseases: Vec<String>,
    pub location: Option<String>,
}

impl EntityMemory {
    pub fn is_empty(&self) -> bool {
        self.hospitals.is_empty()
            && self.doctors.is_empty()
            && self.departments.is_empty()
            && self.diseases.is_empty()
            && self.location.is_none()
    }

    pub fn doctor_names(&self) -> Vec<String> {
        self.doctors.iter().map(|d| d.name.clone()).collect()
    }

    /// Fold another snapshot into this one. A non-null location overwrites
    /// the stored one; a null extraction leaves the last value standing.
    pub fn absorb(&mut self, other: &EntityMemory) {
        add_unique_items(&mut self.hospitals, other.hospitals.iter().cloned());
        add_unique_items(&mut self.departments, other.departments.iter().cloned());
        add_unique_items(&mut self.diseases, other.diseases.iter().cloned());
        add_unique_doctors(&mut self.doctors, other.doctors.iter().cloned());
        if other.location.is_some() {
            self.location = other.location.clone();
        }
    }
}

/// Entities the routing rewrite works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntities {
    pub location: Option<String>,
    pub diseases: Vec<String>,
    pub departments: Vec<String>,
    /// "의사" or "병원", never empty.
    pub target: String,
}

impl Default for RouteEntities {
    fn default() -> Self {
        Self {
            location: None,
            diseases: Vec::new(),
            departments: Vec::new(),
            target: "의사".to_string(),
        }
    }
}

pub fn add_unique_items(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !item.is_empty() && !target.contains(&item) {
            target.push(item);
        }
    }
}

pub fn add_unique_doctors(target: &mut Vec<DoctorRef>, doctors: impl IntoIterator<Item = DoctorRef>) {
    for doc in doctors {
        if doc.name.is_empty() {
            continue;
        }
        let seen = target
            .iter()
            .any(|d| d.name == doc.name && d.hospital == doc.hospital);
        if !seen {
            target.push(doc);
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !matches!(s.as_str(), "" | "None" | "null") => Some(s.clone()),
        Some(Value::Array(items)) => items
            .first()
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from),
        _ => None,
    }
}

/// Extract medical entity mentions from one piece of free text.
///
/// Returns an empty snapshot when the model call or parse fails.
pub async fn extract_entities_from_text(llm: &dyn LlmClient, text: &str) -> EntityMemory {
    let prompt = prompts::entity_extraction_prompt(text);
    let parsed = match llm.classify_json(&prompt).await {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Entity extraction failed");
            return EntityMemory::default();
        }
    };

    let mut snapshot = EntityMemory {
        hospitals: string_list(parsed.get("hospitals")),
        doctors: Vec::new(),
        departments: string_list(parsed.get("departments")),
        diseases: string_list(parsed.get("diseases")),
        location: optional_string(parsed.get("location")),
    };
    let doctors = string_list(parsed.get("doctors")).into_iter().map(|name| DoctorRef {
        name,
        hospital: None,
        department: None,
    });
    add_unique_doctors(&mut snapshot.doctors, doctors);
    snapshot
}

/// Extract the current turn's entities from the last human message and the
/// tool results that followed it. Migrated placeholders carry no entities.
pub async fn extract_turn_entities(
    llm: &dyn LlmClient,
    messages: &[Message],
) -> Option<EntityMemory> {
    let mut snapshot = EntityMemory::default();

    let last_human = transcript::last_human_index(messages);
    if let Some(idx) = last_human {
        let from_human = extract_entities_from_text(llm, messages[idx].content()).await;
        snapshot.absorb(&from_human);

        for msg in &messages[idx + 1..] {
            if msg.is_human() {
                break;
            }
            let Message::ToolResult { content, .. } = msg else {
                continue;
            };
            let Ok(parsed) = serde_json::from_str::<Value>(content) else {
                warn!("Could not parse tool result for entity extraction");
                continue;
            };
            if parsed.get("migrated").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            absorb_tool_answer(&mut snapshot, parsed.get("answer"));
        }
    }

    (!snapshot.is_empty()).then_some(snapshot)
}

fn absorb_tool_answer(snapshot: &mut EntityMemory, answer: Option<&Value>) {
    let Some(Value::Object(answer)) = answer else {
        return;
    };

    if let Some(Value::Array(doctors)) = answer.get("doctors") {
        let refs: Vec<DoctorRef> = doctors
            .iter()
            .filter_map(|d| {
                let name = d.get("name").and_then(Value::as_str)?.to_string();
                let hospital = d
                    .get("hospital_name")
                    .or_else(|| d.get("hospital"))
                    .and_then(Value::as_str)
                    .map(String::from);
                let department = d.get("deptname").and_then(Value::as_str).map(String::from);
                Some(DoctorRef {
                    name,
                    hospital,
                    department,
                })
            })
            .collect();
        let hospitals = refs.iter().filter_map(|d| d.hospital.clone());
        let departments = refs.iter().filter_map(|d| d.department.clone());
        add_unique_items(&mut snapshot.hospitals, hospitals.collect::<Vec<_>>());
        add_unique_items(&mut snapshot.departments, departments.collect::<Vec<_>>());
        add_unique_doctors(&mut snapshot.doctors, refs);
    }

    if let Some(Value::Array(hospitals)) = answer.get("hospitals") {
        let names = hospitals
            .iter()
            .filter_map(|h| h.get("name").and_then(Value::as_str))
            .map(String::from);
        add_unique_items(&mut snapshot.hospitals, names.collect::<Vec<_>>());
        let departments: Vec<String> = hospitals
            .iter()
            .filter_map(|h| h.get("department"))
            .flat_map(|dept| match dept {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect::<Vec<_>>(),
                Value::String(s) => vec![s.clone()],
                _ => Vec::new(),
            })
            .collect();
        add_unique_items(&mut snapshot.departments, departments);
    }

    add_unique_items(&mut snapshot.diseases, string_list(answer.get("disease")));
    add_unique_items(
        &mut snapshot.departments,
        string_list(answer.get("department")),
    );
    add_unique_items(&mut snapshot.hospitals, string_list(answer.get("hospital")));
}

/// Extract routing entities for the catch-all rewrite.
///
/// A failed extraction returns the default with target "의사" so the
/// fallback chain still has something to work with.
pub async fn extract_route_entities(llm: &dyn LlmClient, messages: &[Message]) -> RouteEntities {
    let mut turn_snapshot = extract_turn_entities(llm, messages)
        .await
        .unwrap_or_default();
    // Location goes through the routing prompt rules, not the snapshot.
    turn_snapshot.location = None;

    let history = transcript::render_recent_for_routing(messages, EXTRACTION_HISTORY_LIMIT);
    let prompt = prompts::routing_extraction_prompt(&history, &turn_snapshot);

    let parsed = match llm.classify_json(&prompt).await {
        Ok(Value::Object(parsed)) => parsed,
        Ok(_) => {
            warn!("Routing extraction returned a non-object payload");
            return RouteEntities::default();
        }
        Err(e) => {
            warn!(error = %e, "Routing extraction failed");
            return RouteEntities::default();
        }
    };

    if let Some(reason) = parsed.get("target_reason").and_then(Value::as_str) {
        info!(reason = %reason, "Routing target reason");
    }

    let target = parsed
        .get("target")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or("의사")
        .to_string();

    let entities = RouteEntities {
        location: optional_string(parsed.get("location")),
        diseases: string_list(parsed.get("disease")),
        departments: string_list(parsed.get("department")),
        target,
    };
    info!(?entities, "Extracted entities for routing");
    entities
}

/// Targeted extraction of the most recent department mention. Falls back to
/// the newest department in memory when the model finds none.
pub async fn extract_department_only(
    llm: &dyn LlmClient,
    messages: &[Message],
    memory: &EntityMemory,
) -> Option<String> {
    let history = transcript::render_recent_masked(messages, EXTRACTION_HISTORY_LIMIT);
    let prompt = prompts::department_extraction_prompt(&history, &memory.departments);

    match llm.complete_text(&prompt).await {
        Ok(department) => {
            let department = department.trim();
            if !department.is_empty() && department != "None" && department != "null" {
                info!(department = %department, "Specialized extractor found department");
                return Some(department.to_string());
            }
            memory.departments.last().cloned()
        }
        Err(e) => {
            warn!(error = %e, "Department extraction failed");
            None
        }
    }
}

/// Extract entities from an assistant reply and fold them into memory.
pub async fn update_memory_from_reply(
    llm: &dyn LlmClient,
    reply: &str,
    memory: &mut EntityMemory,
) {
    let extracted = extract_entities_from_text(llm, reply).await;
    memory.absorb(&extracted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockStep};
    use serde_json::json;

    #[test]
    fn doctors_dedupe_on_name_and_hospital() {
        let mut doctors = vec![DoctorRef {
            name: "김철수".to_string(),
            hospital: Some("서울병원".to_string()),
            department: None,
        }];
        add_unique_doctors(
            &mut doctors,
            vec![
                DoctorRef {
                    name: "김철수".to_string(),
                    hospital: Some("서울병원".to_string()),
                    department: Some("내과".to_string()),
                },
                DoctorRef {
                    name: "김철수".to_string(),
                    hospital: Some("부산병원".to_string()),
                    department: None,
                },
            ],
        );
        assert_eq!(doctors.len(), 2);
    }

    #[tokio::test]
    async fn turn_entities_merge_human_and_tool_results() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text(
            r#"{"diseases": ["간암"], "departments": [], "hospitals": [], "doctors": [], "location": null}"#,
        )]);
        let tool_content = json!({
            "chat_type": "recommand_doctor",
            "answer": {
                "doctors": [
                    {"name": "김철수", "hospital": "서울병원", "deptname": "소화기내과"},
                    {"name": "이영희", "hospital_name": "부산병원", "deptname": "외과"}
                ]
            }
        })
        .to_string();
        let messages = vec![
            Message::human("간암 명의 추천해줘"),
            Message::assistant_with_tool_calls(
                "",
                vec![crate::llm::ToolCall {
                    id: "c1".to_string(),
                    name: "getRecommandDoctors".to_string(),
                    arguments: json!({}),
                }],
            ),
            Message::tool_result("c1", &tool_content),
        ];

        let snapshot = extract_turn_entities(&llm, &messages)
            .await
            .expect("entities expected");
        assert_eq!(snapshot.diseases, vec!["간암"]);
        assert_eq!(snapshot.doctors.len(), 2);
        assert_eq!(snapshot.hospitals, vec!["서울병원", "부산병원"]);
        assert_eq!(snapshot.departments, vec!["소화기내과", "외과"]);
    }

    #[tokio::test]
    async fn migrated_results_carry_no_entities() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text(
            r#"{"diseases": [], "departments": [], "hospitals": [], "doctors": [], "location": null}"#,
        )]);
        let migrated = json!({"migrated": true, "result_id": "r1", "summary": "과거 결과"}).to_string();
        let messages = vec![
            Message::human("그 의사 어때?"),
            Message::tool_result("c1", &migrated),
        ];
        assert!(extract_turn_entities(&llm, &messages).await.is_none());
    }

    #[tokio::test]
    async fn route_extraction_reads_tagged_payload() {
        let llm = MockLlmClient::from_steps(vec![
            // Turn snapshot extraction from the human message.
            MockStep::text(
                r#"{"diseases": ["기침"], "departments": [], "hospitals": [], "doctors": [], "location": null}"#,
            ),
            // Routing extraction.
            MockStep::text(
                r#"{"location": null, "disease": "기침", "department": ["호흡기내과"], "target": "병원", "target_reason": "근처 병원 요청"}"#,
            ),
        ]);
        let messages = vec![Message::human("기침이 심한데, 내 근처 병원 알려줘")];
        let entities = extract_route_entities(&llm, &messages).await;
        assert_eq!(entities.target, "병원");
        assert_eq!(entities.diseases, vec!["기침"]);
        assert_eq!(entities.departments, vec!["호흡기내과"]);
        assert!(entities.location.is_none());
    }

    #[tokio::test]
    async fn route_extraction_failure_defaults_to_doctor_target() {
        let llm = MockLlmClient::from_steps(vec![
            MockStep::text(r#"{"diseases": [], "departments": [], "hospitals": [], "doctors": [], "location": null}"#),
            MockStep::text("JSON이 아닙니다"),
        ]);
        let messages = vec![Message::human("어제 말한 곳 다시 알려줘")];
        let entities = extract_route_entities(&llm, &messages).await;
        assert_eq!(entities.target, "의사");
        assert!(entities.diseases.is_empty());
    }

    #[tokio::test]
    async fn department_extractor_falls_back_to_memory() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text("None")]);
        let memory = EntityMemory {
            departments: vec!["내과".to_string(), "소아과".to_string()],
            ..EntityMemory::default()
        };
        let department = extract_department_only(&llm, &[Message::human("음")], &memory).await;
        assert_eq!(department.as_deref(), Some("소아과"));
    }

    #[tokio::test]
    async fn reply_extraction_overwrites_location() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text(
            r#"{"diseases": [], "departments": ["정형외과"], "hospitals": ["강남병원"], "doctors": [], "location": "서울"}"#,
        )]);
        let mut memory = EntityMemory {
            location: Some("부산".to_string()),
            ..EntityMemory::default()
        };
        update_memory_from_reply(&llm, "서울 강남병원 정형외과를 추천드립니다.", &mut memory).await;
        assert_eq!(memory.location.as_deref(), Some("서울"));
        assert_eq!(memory.hospitals, vec!["강남병원"]);
    }
}

//! Session state and its durable snapshot payload.
//!
//! A [`Session`] is an immutable-by-convention value: each pipeline stage
//! takes a session and returns an updated one. Persistence goes through
//! [`SessionSnapshot`], a compact postcard payload saved after every
//! completed turn.

use crate::agent::entity::EntityMemory;
use crate::agent::location::LocationEntry;
use crate::error::{AgentError, Result};
use crate::llm::Message;
use serde::{Deserialize, Serialize};

const CURRENT_SCHEMA_VERSION: u32 = 1;

/// GPS coordinates supplied by the caller alongside a turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Full per-session conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// Ordered transcript, starting with the system message once built.
    pub messages: Vec<Message>,
    /// Location mentions in arrival order, newest last.
    pub location_history: Vec<LocationEntry>,
    /// Entities confirmed across previous turns.
    pub entities: EntityMemory,
    /// BCP 47-ish language code controlling greeting and reply language.
    pub locale: String,
    /// Latest GPS fix supplied by the caller, if consented.
    pub coordinates: Option<Coordinates>,
    /// Token spend accumulated by transcript summarization.
    pub summary_input_tokens: u32,
    pub summary_output_tokens: u32,
    pub summary_total_tokens: u32,
}

impl Session {
    pub fn new(id: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            location_history: Vec::new(),
            entities: EntityMemory::default(),
            locale: locale.into(),
            coordinates: None,
            summary_input_tokens: 0,
            summary_output_tokens: 0,
            summary_total_tokens: 0,
        }
    }

    /// True before the first human message arrives.
    pub fn is_first_interaction(&self) -> bool {
        !self.messages.iter().any(|m| m.is_human())
    }

    /// Build the durable snapshot for this session.
    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let encoded_messages = self
            .messages
            .iter()
            .map(|message| {
                serde_json::to_string(message)
                    .map_err(|e| AgentError::Agent(format!("Failed to encode message: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SessionSnapshot {
            session_id: self.id.clone(),
            messages: encoded_messages,
            location_history: self.location_history.clone(),
            entities: self.entities.clone(),
            locale: self.locale.clone(),
            coordinates: self.coordinates,
            summary_input_tokens: self.summary_input_tokens,
            summary_output_tokens: self.summary_output_tokens,
            summary_total_tokens: self.summary_total_tokens,
            schema_version: CURRENT_SCHEMA_VERSION,
        })
    }
}

/// Snapshot payload persisted after each completed turn.
///
/// Messages are stored JSON-encoded because their tagged representation is
/// not expressible in postcard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    /// JSON-encoded conversation messages.
    pub messages: Vec<String>,
    pub location_history: Vec<LocationEntry>,
    pub entities: EntityMemory,
    pub locale: String,
    pub coordinates: Option<Coordinates>,
    pub summary_input_tokens: u32,
    pub summary_output_tokens: u32,
    pub summary_total_tokens: u32,
    /// Forward-compatible schema version.
    pub schema_version: u32,
}

impl SessionSnapshot {
    /// Decode the snapshot back into a live session.
    pub fn into_session(self) -> Result<Session> {
        let messages = self
            .messages
            .iter()
            .map(|encoded| {
                serde_json::from_str::<Message>(encoded)
                    .map_err(|e| AgentError::Agent(format!("Failed to decode message: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Session {
            id: self.session_id,
            messages,
            location_history: self.location_history,
            entities: self.entities,
            locale: self.locale,
            coordinates: self.coordinates,
            summary_input_tokens: self.summary_input_tokens,
            summary_output_tokens: self.summary_output_tokens,
            summary_total_tokens: self.summary_total_tokens,
        })
    }
}

/// Serialize snapshot payload to compact postcard bytes.
pub fn snapshot_save(snapshot: &SessionSnapshot) -> Result<Vec<u8>> {
    postcard::to_stdvec(snapshot)
        .map_err(|e| AgentError::Agent(format!("Failed to serialize snapshot: {e}")))
}

/// Restore snapshot payload from postcard bytes.
pub fn snapshot_restore(bytes: &[u8]) -> Result<SessionSnapshot> {
    let snapshot: SessionSnapshot = postcard::from_bytes(bytes)
        .map_err(|e| AgentError::Agent(format!("Failed to deserialize snapshot: {e}")))?;

    if snapshot.schema_version == 0 || snapshot.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(AgentError::Agent(format!(
            "Unsupported snapshot schema version: {}",
            snapshot.schema_version
        )));
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::location::LocationStatus;
    use crate::llm::ToolCall;
    use serde_json::json;

    #[test]
    fn snapshot_roundtrip_with_postcard() {
        let mut session = Session::new("sess-1", "ko");
        session.messages = vec![
            Message::system("system text"),
            Message::human("무릎이 아파요"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "search_hospital_by_department".to_string(),
                    arguments: json!({"department": "정형외과"}),
                }],
            ),
            Message::tool_result("call-1", r#"{"chat_type":"search_hospital","answer":{}}"#),
        ];
        session.location_history.push(LocationEntry::Named {
            sido: Some("서울".to_string()),
            sigungu: Some("강남구".to_string()),
            status: LocationStatus::Resolved,
            is_nearby: false,
        });
        session.coordinates = Some(Coordinates {
            latitude: 37.5,
            longitude: 127.0,
        });
        session.summary_total_tokens = 420;

        let snapshot = session.snapshot().expect("build snapshot");
        let bytes = snapshot_save(&snapshot).expect("serialize snapshot");
        let restored = snapshot_restore(&bytes).expect("restore snapshot");
        assert_eq!(restored.schema_version, CURRENT_SCHEMA_VERSION);

        let revived = restored.into_session().expect("decode session");
        assert_eq!(revived.id, "sess-1");
        assert_eq!(revived.messages.len(), 4);
        assert!(revived.messages[2].is_assistant());
        assert_eq!(revived.messages[2].tool_calls().len(), 1);
        assert!(revived.messages[3].is_tool_result());
        assert_eq!(revived.location_history.len(), 1);
        assert_eq!(revived.summary_total_tokens, 420);
    }

    #[test]
    fn snapshot_restore_rejects_unknown_schema() {
        let session = Session::new("sess-2", "ko");
        let mut snapshot = session.snapshot().expect("build snapshot");
        snapshot.schema_version = CURRENT_SCHEMA_VERSION + 1;

        let bytes = postcard::to_stdvec(&snapshot).expect("serialize snapshot");
        let err = snapshot_restore(&bytes).expect_err("must reject future schema");
        assert!(format!("{err}").contains("Unsupported snapshot schema version"));
    }

    #[test]
    fn first_interaction_flips_after_human_message() {
        let mut session = Session::new("sess-3", "ko");
        assert!(session.is_first_interaction());
        session.messages.push(Message::system("system text"));
        assert!(session.is_first_interaction());
        session.messages.push(Message::human("안녕하세요"));
        assert!(!session.is_first_interaction());
    }
}

//! Shaping of completed, failed and cancelled turns into service replies.

use aiga_agent::agent::prompts::{STOPPED_ANSWER, UNEXPECTED_FAILURE_APOLOGY};
use aiga_agent::{Message, TurnResult};
use serde_json::{Map, Value, json};

/// Shape a finished turn into the reply payload handed back to callers.
///
/// A transcript ending in a tool result followed by the assistant's wrap-up
/// becomes the tool payload itself, with the wrap-up attached as `summary`
/// and token counts alongside. A transcript ending in a plain assistant
/// message becomes a `general` reply. Any other tail means the turn engine
/// broke its own contract, so callers get the generic apology.
pub fn shape_reply(result: &TurnResult) -> Value {
    match result.session.messages.as_slice() {
        [
            ..,
            Message::ToolResult { content, .. },
            Message::Assistant {
                content: summary, ..
            },
        ] => {
            let mut body = Map::new();
            body.insert("question".to_string(), json!(result.question));
            body.extend(tool_payload(content));
            body.insert("summary".to_string(), json!(summary));
            insert_token_fields(&mut body, result);
            Value::Object(body)
        }
        [.., Message::Assistant { content, .. }] => {
            let mut body = Map::new();
            body.insert("chat_type".to_string(), json!("general"));
            body.insert("question".to_string(), json!(result.question));
            body.insert("answer".to_string(), json!(content));
            insert_token_fields(&mut body, result);
            Value::Object(body)
        }
        _ => failure_reply(&result.question),
    }
}

/// Fixed reply for a turn cancelled through a stop request.
pub fn stopped_reply(question: &str) -> Value {
    json!({
        "chat_type": "stopped",
        "question": question,
        "answer": STOPPED_ANSWER,
        "total_tokens": 0,
    })
}

/// Fixed reply when turn execution failed before producing an answer.
pub fn failure_reply(question: &str) -> Value {
    json!({
        "chat_type": "general",
        "question": question,
        "answer": UNEXPECTED_FAILURE_APOLOGY,
        "total_tokens": 0,
    })
}

/// Parse a tool result into reply fields. Payloads that are not JSON
/// objects ride along as a general answer string instead.
fn tool_payload(content: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(fields)) => fields,
        _ => {
            let mut fields = Map::new();
            fields.insert("chat_type".to_string(), json!("general"));
            fields.insert("answer".to_string(), json!(content));
            fields
        }
    }
}

fn insert_token_fields(body: &mut Map<String, Value>, result: &TurnResult) {
    let session = &result.session;
    body.insert("input_tokens".to_string(), json!(result.usage.prompt_tokens));
    body.insert(
        "output_tokens".to_string(),
        json!(result.usage.completion_tokens),
    );
    body.insert("total_tokens".to_string(), json!(result.usage.total_tokens));
    body.insert(
        "summary_input_tokens".to_string(),
        json!(session.summary_input_tokens),
    );
    body.insert(
        "summary_output_tokens".to_string(),
        json!(session.summary_output_tokens),
    );
    body.insert(
        "summary_total_tokens".to_string(),
        json!(session.summary_total_tokens),
    );
}

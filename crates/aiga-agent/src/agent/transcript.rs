//! Transcript inspection and repair utilities.
//!
//! Everything here is pure over the message list: pairing repair, stale
//! error removal, retry truncation, and the renderings used for cache keys
//! and extraction prompts.

use crate::agent::prompts;
use crate::llm::{Message, ToolCall};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;

/// Index of the most recent human message.
pub fn last_human_index(messages: &[Message]) -> Option<usize> {
    messages.iter().rposition(|m| m.is_human())
}

/// Keep the transcript up to and including the most recent human message.
/// Used when a rejected answer is retried.
pub fn truncate_to_last_human(messages: &[Message]) -> Vec<Message> {
    match last_human_index(messages) {
        Some(idx) => messages[..=idx].to_vec(),
        None => messages.to_vec(),
    }
}

/// Total content size in characters, the summarization trigger metric.
pub fn content_char_count(messages: &[Message]) -> usize {
    messages.iter().map(|m| m.content().chars().count()).sum()
}

/// Drop error apologies left by previous turns.
///
/// Messages up to the current human message always stay. After it, an
/// assistant message carrying a known failure apology is noise from a
/// failed attempt and gets removed.
pub fn scrub_stale_errors(messages: &[Message]) -> Vec<Message> {
    let patterns = [
        prompts::UNEXPECTED_FAILURE_APOLOGY,
        prompts::CONTENT_FILTER_APOLOGY,
    ];
    let last_human = last_human_index(messages);

    messages
        .iter()
        .enumerate()
        .filter(|(i, msg)| {
            if last_human.is_some_and(|idx| *i <= idx) {
                return true;
            }
            if msg.is_assistant() {
                let stale = patterns.iter().any(|p| msg.content().contains(p));
                if stale {
                    info!("Removed stale error message from context");
                }
                return !stale;
            }
            true
        })
        .map(|(_, msg)| msg.clone())
        .collect()
}

/// Repair tool call pairing.
///
/// Every tool call must be answered by a result with the same id before the
/// conversation moves on. Unanswered calls are removed from their assistant
/// message and orphaned results are dropped.
pub fn sanitize_pairing(messages: &[Message]) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::with_capacity(messages.len());
    let mut i = 0;

    while i < messages.len() {
        if let Message::Assistant {
            content,
            tool_calls,
        } = &messages[i]
        {
            if !tool_calls.is_empty() {
                let mut results: Vec<(String, Message)> = Vec::new();
                let mut j = i + 1;
                while j < messages.len() {
                    if let Message::ToolResult { call_id, .. } = &messages[j] {
                        results.push((call_id.clone(), messages[j].clone()));
                        j += 1;
                    } else {
                        break;
                    }
                }

                let answered: Vec<ToolCall> = tool_calls
                    .iter()
                    .filter(|tc| results.iter().any(|(id, _)| id == &tc.id))
                    .cloned()
                    .collect();
                let matched: Vec<Message> = results
                    .into_iter()
                    .filter(|(id, _)| tool_calls.iter().any(|tc| &tc.id == id))
                    .map(|(_, m)| m)
                    .collect();

                if answered.is_empty() {
                    out.push(Message::assistant(content.clone()));
                } else {
                    out.push(Message::Assistant {
                        content: content.clone(),
                        tool_calls: answered,
                    });
                    out.extend(matched);
                }
                i = j;
                continue;
            }
        }

        if matches!(messages[i], Message::ToolResult { .. }) {
            i += 1;
            continue;
        }
        out.push(messages[i].clone());
        i += 1;
    }

    out
}

fn render_for_memo(messages: &[Message]) -> String {
    let lines: Vec<String> = messages
        .iter()
        .map(|msg| match msg {
            Message::System { content } => format!("S:{content}"),
            Message::Human { content } => format!("H:{content}"),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                if tool_calls.is_empty() {
                    format!("A:{content}")
                } else {
                    let calls = tool_calls
                        .iter()
                        .map(|tc| format!("T:{}({})", tc.name, tc.arguments))
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("A:{content}[{calls}]")
                }
            }
            Message::ToolResult { call_id, content } => {
                format!("ToolResult({call_id}):{content}")
            }
        })
        .collect();
    lines.join("\n")
}

/// Cache key for the whole-transcript response memo.
pub fn memo_digest(messages: &[Message]) -> String {
    let rendered = render_for_memo(messages);
    format!("chat:{}", hex::encode(Sha256::digest(rendered.as_bytes())))
}

fn type_name(msg: &Message) -> &'static str {
    match msg {
        Message::System { .. } => "SystemMessage",
        Message::Human { .. } => "HumanMessage",
        Message::Assistant { .. } => "AIMessage",
        Message::ToolResult { .. } => "ToolMessage",
    }
}

/// Render the recent transcript for the routing extraction prompt.
///
/// Tool results are reduced to their answer payload with address fields
/// removed so the model cannot mistake a hospital address for the user's
/// location.
pub fn render_recent_for_routing(messages: &[Message], limit: usize) -> String {
    let start = messages.len().saturating_sub(limit);
    messages[start..]
        .iter()
        .map(|msg| match msg {
            Message::ToolResult { content, .. } => {
                let Ok(parsed) = serde_json::from_str::<Value>(content) else {
                    return format!("ToolMessage: {content}");
                };
                if parsed.get("migrated").and_then(Value::as_bool) == Some(true) {
                    return "ToolMessage: [Previous tool result (migrated)]".to_string();
                }
                match parsed.get("answer") {
                    Some(Value::Object(answer)) => {
                        let mut answer = answer.clone();
                        for key in ["address", "hospital_address", "location"] {
                            answer.remove(key);
                        }
                        let rendered = serde_json::to_string(&Value::Object(answer))
                            .unwrap_or_else(|_| content.clone());
                        format!("ToolMessage (answer): {rendered}")
                    }
                    Some(answer) if !answer.is_null() => {
                        let rendered =
                            serde_json::to_string(answer).unwrap_or_else(|_| content.clone());
                        format!("ToolMessage (answer): {rendered}")
                    }
                    _ => format!("ToolMessage: {content}"),
                }
            }
            other => format!("{}: {}", type_name(other), other.content()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the recent transcript with tool results fully masked.
pub fn render_recent_masked(messages: &[Message], limit: usize) -> String {
    let start = messages.len().saturating_sub(limit);
    messages[start..]
        .iter()
        .map(|msg| match msg {
            Message::ToolResult { .. } => "ToolMessage: [Previous tool result]".to_string(),
            other => format!("{}: {}", type_name(other), other.content()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

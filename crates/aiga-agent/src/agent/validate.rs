//! Answer validation stage.
//!
//! After the model produces a final answer, an optional judgment call checks
//! whether it actually addresses the question. A rejected answer rolls the
//! transcript back to the last human message so the agent stage runs again.

use tracing::warn;

use crate::agent::{prompts, transcript};
use crate::error::Result;
use crate::llm::{LlmClient, Message};

/// Validation gate settings.
#[derive(Debug, Clone, Copy)]
pub struct ValidationPolicy {
    pub enabled: bool,
    pub retry_limit: u32,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            retry_limit: 3,
        }
    }
}

/// Outcome of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationVerdict {
    /// Answer stands; the retry counter resets.
    Accepted,
    /// Answer rejected; transcript was rolled back and the agent runs again.
    Retry { attempt: u32 },
}

/// Judge the newest answer against the newest question.
///
/// Disabled validation and exhausted retries both accept unconditionally.
pub async fn validate_answer(
    llm: &dyn LlmClient,
    messages: &[Message],
    policy: ValidationPolicy,
    retry: u32,
) -> Result<(ValidationVerdict, Vec<Message>)> {
    if !policy.enabled || retry >= policy.retry_limit {
        return Ok((ValidationVerdict::Accepted, messages.to_vec()));
    }

    let answer = messages.last().map(Message::content).unwrap_or_default();
    let question = messages
        .iter()
        .rev()
        .find(|m| m.is_human())
        .map(Message::content)
        .unwrap_or_default();

    let prompt = prompts::validation_prompt(question, answer);
    if llm.ask_yes_no(&prompt).await? {
        return Ok((ValidationVerdict::Accepted, messages.to_vec()));
    }

    warn!(attempt = retry + 1, "Answer rejected by validation, retrying");
    let rolled_back = transcript::truncate_to_last_human(messages);
    Ok((ValidationVerdict::Retry { attempt: retry + 1 }, rolled_back))
}

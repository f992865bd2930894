//! The conversational turn controller.
//!
//! One `run_turn` call drives a full turn over a checkpointed session:
//! deterministic early intents, location and entity context updates,
//! transcript compaction, the completion call with cache rehydration and
//! fault recovery, tool dispatch rounds, answer validation, and finally a
//! durable checkpoint.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::classify::{Intent, KeywordClassifier, QueryClassifier};
use crate::agent::compactor::{self, CACHE_RESTORE_TOOL};
use crate::agent::entity;
use crate::agent::geocode::{NominatimGeocoder, ReverseGeocoder, format_korean_address};
use crate::agent::location;
use crate::agent::prompts;
use crate::agent::sanitize::{KeywordSanitizer, Sanitizer};
use crate::agent::session::{Coordinates, Session, snapshot_restore, snapshot_save};
use crate::agent::transcript;
use crate::agent::validate::{self, ValidationPolicy, ValidationVerdict};
use crate::error::{AgentError, Result};
use crate::llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, TokenUsage,
};
use crate::tools::{DispatchContext, ToolDispatcher};
use aiga_storage::Storage;

/// Tunables for turn execution.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Service name used in fixed refusal replies.
    pub service_name: String,
    /// Locale assumed when the caller does not send one.
    pub default_locale: String,
    pub validation: ValidationPolicy,
    /// Content size in characters past which the old transcript summarizes.
    pub summary_char_threshold: usize,
    /// Messages kept verbatim when summarizing without a tool boundary.
    pub summary_keep_tail: usize,
    /// Move tool results older than the current turn out to the cache.
    pub externalize_results: bool,
    /// How many recent placeholders get a name excerpt folded back in.
    pub restoration_limit: usize,
    /// Lifetime of memoized answers.
    pub memo_ttl_secs: i64,
    /// Upper bound on tool dispatch rounds within one turn.
    pub max_tool_rounds: usize,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            service_name: "AIGA".to_string(),
            default_locale: "ko".to_string(),
            validation: ValidationPolicy::default(),
            summary_char_threshold: 5000,
            summary_keep_tail: 4,
            externalize_results: true,
            restoration_limit: 10,
            memo_ttl_secs: 3600,
            max_tool_rounds: 25,
        }
    }
}

impl TurnConfig {
    /// Set the service name used in fixed replies
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the fallback locale
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Set the answer validation policy
    pub fn with_validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = policy;
        self
    }

    /// Set the summarization trigger size
    pub fn with_summary_char_threshold(mut self, chars: usize) -> Self {
        self.summary_char_threshold = chars;
        self
    }

    /// Set how many messages survive a summarization verbatim
    pub fn with_summary_keep_tail(mut self, keep: usize) -> Self {
        self.summary_keep_tail = keep;
        self
    }

    /// Enable or disable tool result externalization
    pub fn with_externalization(mut self, enabled: bool) -> Self {
        self.externalize_results = enabled;
        self
    }

    /// Set the proactive placeholder enrichment limit
    pub fn with_restoration_limit(mut self, limit: usize) -> Self {
        self.restoration_limit = limit;
        self
    }

    /// Set the memoized answer lifetime
    pub fn with_memo_ttl(mut self, secs: i64) -> Self {
        self.memo_ttl_secs = secs;
        self
    }

    /// Set the tool dispatch round bound
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }
}

/// Result of one completed turn.
#[derive(Debug)]
pub struct TurnResult {
    /// The user message this turn answered.
    pub question: String,
    /// Token usage of the completion call that produced the answer.
    pub usage: TokenUsage,
    /// Session state after the turn, already checkpointed.
    pub session: Session,
}

/// Where one agent step landed.
enum AgentStep {
    /// The model requested tool executions.
    RequestedTools,
    /// A model answer that still goes through validation.
    Answered,
    /// A deterministic reply that ends the turn as-is.
    Final,
}

/// Drives conversational turns over checkpointed sessions.
pub struct TurnController {
    llm: Arc<dyn LlmClient>,
    summary_llm: Arc<dyn LlmClient>,
    dispatcher: Arc<dyn ToolDispatcher>,
    classifier: Arc<dyn QueryClassifier>,
    sanitizer: Arc<dyn Sanitizer>,
    geocoder: Arc<dyn ReverseGeocoder>,
    storage: Arc<Storage>,
    config: TurnConfig,
}

impl TurnController {
    /// Create a controller with the default classifier, sanitizer and geocoder.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        summary_llm: Arc<dyn LlmClient>,
        dispatcher: Arc<dyn ToolDispatcher>,
        storage: Arc<Storage>,
        config: TurnConfig,
    ) -> Self {
        Self {
            llm,
            summary_llm,
            dispatcher,
            classifier: Arc::new(KeywordClassifier::new()),
            sanitizer: Arc::new(KeywordSanitizer),
            geocoder: Arc::new(NominatimGeocoder::new()),
            storage,
            config,
        }
    }

    /// Swap the early intent classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn QueryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Swap the message sanitizer used on content filter retries
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Swap the reverse geocoder
    pub fn with_geocoder(mut self, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Run one user message through the agent loop and checkpoint the result.
    pub async fn run_turn(
        &self,
        session_id: &str,
        message: &str,
        locale: Option<&str>,
        coordinates: Option<Coordinates>,
    ) -> Result<TurnResult> {
        let mut session = self.load_session(session_id)?;
        session.locale = locale.unwrap_or(self.config.default_locale.as_str()).to_string();
        session.coordinates = coordinates;
        info!(
            session_id = %session_id,
            first_interaction = session.is_first_interaction(),
            "Turn started"
        );
        session.messages.push(Message::human(message));

        let mut retry = 0u32;
        let mut rounds = 0usize;
        let mut memo_key: Option<String> = None;
        let mut last_usage = TokenUsage::default();

        loop {
            match self
                .agent_step(&mut session, &mut memo_key, &mut last_usage)
                .await?
            {
                AgentStep::RequestedTools => {
                    rounds += 1;
                    if rounds > self.config.max_tool_rounds {
                        return Err(AgentError::Agent(format!(
                            "Tool round limit ({}) exceeded",
                            self.config.max_tool_rounds
                        )));
                    }
                    self.dispatch_tools(&mut session).await;
                }
                AgentStep::Answered => {
                    let (verdict, messages) = validate::validate_answer(
                        self.llm.as_ref(),
                        &session.messages,
                        self.config.validation,
                        retry,
                    )
                    .await?;
                    session.messages = messages;
                    match verdict {
                        ValidationVerdict::Accepted => break,
                        ValidationVerdict::Retry { attempt } => retry = attempt,
                    }
                }
                AgentStep::Final => break,
            }
        }

        session.messages = transcript::sanitize_pairing(&session.messages);
        self.store_memo(memo_key.as_deref(), &session);
        self.save_checkpoint(&session)?;

        Ok(TurnResult {
            question: message.to_string(),
            usage: last_usage,
            session,
        })
    }

    /// One Agent-state visit: answer deterministically, or call the model
    /// and report whether it answered or asked for tools.
    async fn agent_step(
        &self,
        session: &mut Session,
        memo_key: &mut Option<String>,
        last_usage: &mut TokenUsage,
    ) -> Result<AgentStep> {
        let greeting = prompts::greeting_for(&session.locale);
        let is_first = session.messages.iter().filter(|m| m.is_human()).count() == 1;
        let user_message = match session.messages.last() {
            Some(message) if message.is_human() => message.content().to_string(),
            _ => String::new(),
        };

        // The entry phase runs when the step starts from a fresh user
        // message, not when it resumes after tool results.
        if !user_message.is_empty() {
            match self.classifier.classify(&user_message) {
                Intent::Emergency => {
                    session.messages.push(Message::assistant(canned_reply(
                        greeting,
                        prompts::EMERGENCY_INTRODUCTION,
                        is_first,
                    )));
                    return Ok(AgentStep::Final);
                }
                Intent::ForbiddenRecommendation { term } => {
                    let reply =
                        prompts::forbidden_recommendation_reply(&self.config.service_name, &term);
                    session
                        .messages
                        .push(Message::assistant(canned_reply(greeting, &reply, is_first)));
                    return Ok(AgentStep::Final);
                }
                Intent::CurrentLocation => {
                    let mut reply = self.describe_current_position(session).await;
                    if is_first {
                        reply = format!("{greeting}\n\n {reply}");
                    }
                    session.messages.push(Message::assistant(reply));
                    return Ok(AgentStep::Final);
                }
                Intent::General => {}
            }

            let coordinates = session.coordinates.map(|c| (c.latitude, c.longitude));
            let (history, clarification) = location::update_location_context(
                self.summary_llm.as_ref(),
                &user_message,
                &session.location_history,
                coordinates,
            )
            .await?;
            session.location_history = history;

            self.refresh_entities(session).await;

            if let Some(question) = clarification {
                session
                    .messages
                    .push(Message::assistant(canned_reply(greeting, &question, is_first)));
                return Ok(AgentStep::Final);
            }
        }

        // Compose the working transcript under a freshly built system message.
        let mut composed: Vec<Message> = session
            .messages
            .iter()
            .filter(|m| !m.is_system())
            .cloned()
            .collect();
        composed.insert(0, Message::system(self.system_text(session)));

        if self.config.externalize_results {
            composed = compactor::externalize_tool_results(&self.storage, &session.id, &composed);
            composed = compactor::enrich_recent_placeholders(
                &self.storage,
                &session.id,
                &composed,
                self.config.restoration_limit,
            );
        }
        composed = transcript::scrub_stale_errors(&composed);

        let (composed, summary_usage) = compactor::summarize_if_needed(
            self.summary_llm.as_ref(),
            &composed,
            self.config.summary_char_threshold,
            self.config.summary_keep_tail,
        )
        .await?;
        session.summary_input_tokens += summary_usage.prompt_tokens;
        session.summary_output_tokens += summary_usage.completion_tokens;
        session.summary_total_tokens += summary_usage.total_tokens;

        // Compaction is canonical: the session keeps what the model sees.
        session.messages = composed;

        let digest = transcript::memo_digest(&session.messages);
        match self.storage.response_memo.get(&digest) {
            Ok(Some(cached)) => {
                info!("Identical transcript seen before, replaying memoized answer");
                *memo_key = None;
                *last_usage = TokenUsage::default();
                session.messages.push(Message::assistant(cached));
                return Ok(AgentStep::Final);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Response memo lookup failed"),
        }
        *memo_key = Some(digest);

        let (response, synthetic) = match self.invoke_with_rehydration(session).await {
            Ok(response) => (response, false),
            Err(e) if e.is_protocol_fault() => {
                warn!(error = %e, "Malformed completion payload, replacing the last answer");
                *memo_key = None;
                let apology = Message::assistant(prompts::PROCESSING_FAILURE_APOLOGY);
                match session.messages.iter().rposition(|m| m.is_assistant()) {
                    Some(idx) => session.messages[idx] = apology,
                    None => session.messages.push(apology),
                }
                return Ok(AgentStep::Final);
            }
            Err(e) if e.is_content_filter() => {
                warn!(error = %e, "Content filter tripped, retrying with a softened message");
                match self.retry_with_sanitized_message(session).await {
                    Ok(response) => (response, false),
                    Err(retry_error) => {
                        warn!(error = %retry_error, "Sanitized retry failed as well");
                        *memo_key = None;
                        (apology_response(prompts::CONTENT_FILTER_APOLOGY), true)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Completion call failed");
                *memo_key = None;
                (apology_response(prompts::PROCESSING_FAILURE_APOLOGY), true)
            }
        };

        let mut content = response.content.unwrap_or_default();
        if is_first && !content.trim_start().starts_with(greeting) {
            content = format!("{greeting}\n\n {content}");
        }
        *last_usage = response.usage.unwrap_or_default();

        if response.tool_calls.is_empty() {
            session.messages.push(Message::assistant(content));
            if synthetic {
                Ok(AgentStep::Final)
            } else {
                Ok(AgentStep::Answered)
            }
        } else {
            session
                .messages
                .push(Message::assistant_with_tool_calls(content, response.tool_calls));
            Ok(AgentStep::RequestedTools)
        }
    }

    /// Call the completion service. When the model only asks for cached
    /// results, restore them inline and re-invoke once; further cache
    /// requests fall through to the normal tool path.
    async fn invoke_with_rehydration(&self, session: &mut Session) -> Result<CompletionResponse> {
        let schemas = self.dispatcher.schemas();
        let request = CompletionRequest::new(session.messages.clone()).with_tools(schemas.clone());
        let response = self.llm.complete(request).await?;

        let all_cache_requests = !response.tool_calls.is_empty()
            && response
                .tool_calls
                .iter()
                .all(|call| call.name == CACHE_RESTORE_TOOL);
        if !all_cache_requests {
            return Ok(response);
        }

        info!(
            count = response.tool_calls.len(),
            "Restoring cached results before answering"
        );
        let staged = Message::assistant_with_tool_calls(
            response.content.unwrap_or_default(),
            response.tool_calls.clone(),
        );
        let restored =
            compactor::restore_cached_results(&self.storage, &session.id, &response.tool_calls);

        let mut rehydrated = session.messages.clone();
        rehydrated.push(staged.clone());
        rehydrated.extend(restored.iter().cloned());
        let second = self
            .llm
            .complete(CompletionRequest::new(rehydrated).with_tools(schemas))
            .await?;

        // The restore exchange becomes part of the transcript once it answered.
        session.messages.push(staged);
        session.messages.extend(restored);
        Ok(second)
    }

    /// Re-run the completion with the newest user message softened. The
    /// durable transcript keeps the original wording.
    async fn retry_with_sanitized_message(&self, session: &Session) -> Result<CompletionResponse> {
        let mut retry_messages = session.messages.clone();
        let idx = transcript::last_human_index(&retry_messages)
            .ok_or_else(|| AgentError::Agent("No user message to soften".to_string()))?;
        let softened = self.sanitizer.sanitize(retry_messages[idx].content());
        info!(softened = %softened, "Retrying completion with softened message");
        retry_messages[idx] = Message::human(softened);
        self.llm
            .complete(CompletionRequest::new(retry_messages).with_tools(self.dispatcher.schemas()))
            .await
    }

    /// Execute the calls the model just requested, in order, one result each.
    async fn dispatch_tools(&self, session: &mut Session) {
        let calls = match session.messages.last() {
            Some(Message::Assistant { tool_calls, .. }) => tool_calls.clone(),
            _ => return,
        };
        let ctx = self.dispatch_context(session);
        for call in &calls {
            info!(tool = %call.name, "Dispatching tool call");
            let output = self.dispatcher.dispatch(call, &ctx).await;
            session
                .messages
                .push(Message::tool_result(call.id.clone(), output.content()));
        }
    }

    fn dispatch_context(&self, session: &Session) -> DispatchContext {
        DispatchContext {
            session_id: session.id.clone(),
            locale: session.locale.clone(),
            coordinates: session.coordinates,
            resolved_location: location::resolved_location_string(&session.location_history),
            proximity: location::proximity_from_history(&session.location_history),
            entities: session.entities.clone(),
            recent_messages: session.messages.clone(),
            llm: Arc::clone(&self.llm),
        }
    }

    /// The assistant reply right before the newest user message names what
    /// the user is reacting to; fold its entities into memory.
    async fn refresh_entities(&self, session: &mut Session) {
        let Some(idx) = transcript::last_human_index(&session.messages) else {
            return;
        };
        if idx == 0 {
            return;
        }
        let previous = &session.messages[idx - 1];
        if !previous.is_assistant() || previous.content().trim().is_empty() {
            return;
        }
        let reply = previous.content().to_string();
        entity::update_memory_from_reply(self.summary_llm.as_ref(), &reply, &mut session.entities)
            .await;
    }

    fn system_text(&self, session: &Session) -> String {
        let mut text = String::from(prompts::SYSTEM_PROMPT);
        if !session.entities.is_empty() {
            text.push_str(&prompts::inherited_entities_block(&session.entities));
        }
        if let Some(coordinates) = &session.coordinates {
            text.push_str(&prompts::gps_block(coordinates));
        }
        text.push_str(&prompts::language_rule(&session.locale));
        text
    }

    async fn describe_current_position(&self, session: &Session) -> String {
        let Some(coordinates) = session.coordinates else {
            return prompts::NO_POSITION_REPLY.to_string();
        };
        match self
            .geocoder
            .reverse(coordinates.latitude, coordinates.longitude)
            .await
        {
            Ok(Some(address)) => prompts::current_position_reply(&format_korean_address(&address)),
            Ok(None) => {
                prompts::unresolved_position_reply(coordinates.latitude, coordinates.longitude)
            }
            Err(e) => {
                warn!(error = %e, "Reverse geocoding failed");
                prompts::unresolved_position_reply(coordinates.latitude, coordinates.longitude)
            }
        }
    }

    fn load_session(&self, session_id: &str) -> Result<Session> {
        let raw = self
            .storage
            .checkpoints
            .get_raw(session_id)
            .map_err(|e| AgentError::Storage(format!("Checkpoint load failed: {e}")))?;
        match raw {
            Some(bytes) => snapshot_restore(&bytes)?.into_session(),
            None => Ok(Session::new(session_id, self.config.default_locale.as_str())),
        }
    }

    fn save_checkpoint(&self, session: &Session) -> Result<()> {
        let snapshot = session.snapshot()?;
        let bytes = snapshot_save(&snapshot)?;
        self.storage
            .checkpoints
            .put_raw(&session.id, &bytes)
            .map_err(|e| AgentError::Storage(format!("Checkpoint save failed: {e}")))
    }

    /// Memoize the final answer under the digest of the transcript that
    /// preceded the completion call. Fault apologies are never memoized.
    fn store_memo(&self, digest: Option<&str>, session: &Session) {
        let Some(digest) = digest else { return };
        let Some(Message::Assistant {
            content,
            tool_calls,
        }) = session.messages.last()
        else {
            return;
        };
        if !tool_calls.is_empty() || content.trim().is_empty() {
            return;
        }
        if let Err(e) = self
            .storage
            .response_memo
            .put(digest, content, self.config.memo_ttl_secs)
        {
            warn!(error = %e, "Response memo store failed");
        }
    }
}

/// Fixed replies carry the greeting header on a session's first interaction.
fn canned_reply(greeting: &str, text: &str, is_first: bool) -> String {
    if is_first {
        format!("{greeting}\n\n  {text}")
    } else {
        text.to_string()
    }
}

fn apology_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
        finish_reason: FinishReason::Error,
        usage: None,
    }
}

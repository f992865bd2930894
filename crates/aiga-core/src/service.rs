//! Cancellable turn execution keyed by session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use aiga_agent::{Coordinates, TurnController};
use dashmap::DashMap;
use serde_json::Value;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::reply;

struct ActiveTurn {
    seq: u64,
    abort: AbortHandle,
}

/// Runs turns as abortable tasks and answers stop requests.
///
/// Every reply is a shaped JSON payload; faults and cancellations come
/// back as fixed reply shapes instead of errors.
pub struct TurnService {
    controller: Arc<TurnController>,
    active: DashMap<String, ActiveTurn>,
    turn_seq: AtomicU64,
}

impl TurnService {
    pub fn new(controller: TurnController) -> Self {
        Self {
            controller: Arc::new(controller),
            active: DashMap::new(),
            turn_seq: AtomicU64::new(0),
        }
    }

    /// Run one turn to completion as an abortable unit of work.
    ///
    /// Starting a turn for a session that already has one in flight does
    /// not cancel the older turn; the newest registration is the one a
    /// stop request acts on.
    pub async fn start_turn(
        &self,
        session_id: &str,
        message: &str,
        locale: Option<&str>,
        coordinates: Option<Coordinates>,
    ) -> Value {
        let seq = self.turn_seq.fetch_add(1, Ordering::Relaxed);
        let controller = Arc::clone(&self.controller);
        let owned_session = session_id.to_string();
        let owned_message = message.to_string();
        let owned_locale = locale.map(str::to_string);
        let handle = tokio::spawn(async move {
            controller
                .run_turn(
                    &owned_session,
                    &owned_message,
                    owned_locale.as_deref(),
                    coordinates,
                )
                .await
        });

        self.active.insert(
            session_id.to_string(),
            ActiveTurn {
                seq,
                abort: handle.abort_handle(),
            },
        );

        let joined = handle.await;
        // A later turn may have replaced the registration; only drop our own.
        self.active.remove_if(session_id, |_, turn| turn.seq == seq);

        match joined {
            Ok(Ok(result)) => reply::shape_reply(&result),
            Ok(Err(e)) => {
                error!(session_id, error = %e, "Turn failed");
                reply::failure_reply(message)
            }
            Err(join_error) if join_error.is_cancelled() => {
                info!(session_id, "Turn aborted by stop request");
                reply::stopped_reply(message)
            }
            Err(join_error) => {
                error!(session_id, error = %join_error, "Turn task failed");
                reply::failure_reply(message)
            }
        }
    }

    /// Abort the in-flight turn for a session, reporting whether one existed.
    pub fn stop_turn(&self, session_id: &str) -> bool {
        if let Some((_, turn)) = self.active.remove(session_id) {
            turn.abort.abort();
            info!("Execution stopped for session_id({session_id})");
            true
        } else {
            warn!("No active execution found for session_id({session_id})");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use aiga_agent::{LlmClient, MockLlmClient, MockStep};
    use aiga_tools::InMemoryDirectory;
    use tempfile::TempDir;

    use crate::config::AppConfig;
    use crate::context::AppContext;

    fn service_with_script(steps: Vec<MockStep>) -> (TurnService, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("aiga-db");
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::from_steps(steps));
        let context = AppContext::with_clients(
            AppConfig::default(),
            db_path.to_str().expect("utf-8 path"),
            Arc::new(InMemoryDirectory::default()),
            llm.clone(),
            llm,
        )
        .expect("context should build");
        (context.turn_service(), dir)
    }

    #[tokio::test]
    async fn completed_turn_returns_a_general_reply() {
        let (service, _dir) = service_with_script(Vec::new());

        let reply = service.start_turn("s-reply", "안녕하세요", None, None).await;

        assert_eq!(reply["chat_type"], "general");
        assert_eq!(reply["question"], "안녕하세요");
        assert!(!reply["answer"].as_str().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn completed_turn_clears_the_active_registration() {
        let (service, _dir) = service_with_script(Vec::new());

        service.start_turn("s-done", "안녕하세요", None, None).await;

        assert!(!service.stop_turn("s-done"));
    }

    #[tokio::test]
    async fn stop_turn_without_active_execution_reports_nothing_stopped() {
        let (service, _dir) = service_with_script(Vec::new());

        assert!(!service.stop_turn("s-ghost"));
    }

    #[tokio::test]
    async fn stop_turn_aborts_an_in_flight_turn() {
        let (service, _dir) = service_with_script(vec![
            MockStep::text("아직 검색 중입니다.").with_delay(30_000),
        ]);

        let (reply, stopped) = tokio::join!(
            service.start_turn("s-cancel", "허리가 아파서 병원 찾아줘", None, None),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                service.stop_turn("s-cancel")
            }
        );

        assert!(stopped);
        assert_eq!(reply["chat_type"], "stopped");
        assert_eq!(reply["question"], "허리가 아파서 병원 찾아줘");
        assert_eq!(reply["total_tokens"], 0);
    }
}

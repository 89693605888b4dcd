use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use selector_core::dispatch::{DispatchStats, QueuedDispatcher};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    dispatcher: QueuedDispatcher,
}

impl HealthState {
    pub fn new(dispatcher: QueuedDispatcher) -> Self {
        Self { dispatcher }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchHealth {
    pub status: &'static str,
    pub queued: usize,
    #[serde(flatten)]
    pub stats: DispatchStats,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub dispatch: DispatchHealth,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let ready = !state.dispatcher.is_closed();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "selector-server runtime initialized".to_string(),
        },
        dispatch: DispatchHealth {
            status: if ready { "accepting" } else { "closed" },
            queued: state.dispatcher.queued(),
            stats: state.dispatcher.stats(),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{extract::State, http::StatusCode, Json};
    use selector_core::dispatch::{CommandWorker, DispatchPolicy, QueuedDispatcher};
    use selector_core::domain::command::Command;
    use selector_core::errors::WorkerError;

    use crate::health::{health, HealthState};

    struct IdleWorker;

    #[async_trait]
    impl CommandWorker for IdleWorker {
        async fn execute(&self, _command: Command) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn health_returns_ready_while_dispatcher_accepts() {
        let (dispatcher, runtime) =
            QueuedDispatcher::spawn(Arc::new(IdleWorker), DispatchPolicy::default(), 4);

        let (status, Json(payload)) = health(State(HealthState::new(dispatcher))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.dispatch.status, "accepting");
        assert_eq!(payload.dispatch.stats.accepted, 0);
        assert_eq!(payload.service.status, "ready");

        runtime.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_after_shutdown() {
        let (dispatcher, runtime) =
            QueuedDispatcher::spawn(Arc::new(IdleWorker), DispatchPolicy::default(), 4);
        runtime.shutdown(Duration::from_secs(1)).await;

        let (status, Json(payload)) = health(State(HealthState::new(dispatcher))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.dispatch.status, "closed");
    }
}

//! `POST /select`: verify, parse, acknowledge.
//!
//! Everything here runs inside the acknowledgment budget. The handler never touches
//! the provider's Web API and never waits on the worker; the only I/O is the signing
//! secret read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use selector_core::errors::GENERIC_ACK_FAILURE_MESSAGE;
use selector_core::secrets::SecretStore;
use selector_core::verify::{
    SignatureVerifier, VerificationContext, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use selector_slack::ack::{AckDisposition, AckResponder};
use selector_slack::blocks::{ack_failure, ResponsePayload};
use selector_slack::commands::parse_slash_command;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct WebhookState {
    pub secrets: Arc<dyn SecretStore>,
    pub secret_name: String,
    pub signing_secret_key: String,
    pub verifier: SignatureVerifier,
    pub responder: AckResponder,
    pub ack_budget: Duration,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/select", post(select)).with_state(state)
}

enum Rejection {
    Unauthorized,
    Failed,
}

pub async fn select(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let outcome = tokio::time::timeout(state.ack_budget, acknowledge(&state, &headers, &body)).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(Ok(payload)) => {
            info!(event_name = "ingress.select.acknowledged", elapsed_ms, "ack returned");
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(Err(Rejection::Unauthorized)) => {
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
        }
        Ok(Err(Rejection::Failed)) => generic_failure(),
        Err(_) => {
            error!(
                event_name = "ingress.select.ack_budget_exceeded",
                budget_ms = u64::try_from(state.ack_budget.as_millis()).unwrap_or(u64::MAX),
                "acknowledgment budget exceeded"
            );
            generic_failure()
        }
    }
}

async fn acknowledge(
    state: &WebhookState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ResponsePayload, Rejection> {
    let secret = state.secrets.get(&state.secret_name, &state.signing_secret_key).await.map_err(
        |secret_error| {
            error!(
                event_name = "ingress.select.secret_unavailable",
                error = %secret_error,
                "signing secret could not be read"
            );
            Rejection::Failed
        },
    )?;

    let context = VerificationContext {
        secret: &secret,
        signature: header_value(headers, SIGNATURE_HEADER),
        timestamp: header_value(headers, TIMESTAMP_HEADER),
        body,
    };
    if let Err(reason) = state.verifier.verify(&context) {
        warn!(
            event_name = "ingress.select.rejected",
            reason = reason.as_str(),
            "request failed signature verification"
        );
        return Err(Rejection::Unauthorized);
    }

    let command = parse_slash_command(body).map_err(|parse_error| {
        warn!(
            event_name = "ingress.select.unparseable",
            error = %parse_error,
            "verified request could not be parsed"
        );
        Rejection::Failed
    })?;

    let ack = state.responder.acknowledge(&command);
    if let AckDisposition::Dispatched { task_id } = &ack.disposition {
        info!(
            event_name = "ingress.select.dispatched",
            correlation_id = %command.correlation_id(),
            task_id = %task_id,
            group_id = %command.channel_id,
            user_id = %command.user_id,
            "command dispatched"
        );
    }
    Ok(ack.payload)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn generic_failure() -> Response {
    (StatusCode::OK, Json(ack_failure(GENERIC_ACK_FAILURE_MESSAGE))).into_response()
}

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use selector_core::config::{AppConfig, ConfigError, LoadOptions};
use selector_core::dispatch::{DispatchPolicy, DispatchRuntime, QueuedDispatcher};
use selector_core::secrets::{store_from_config, SecretStore};
use selector_core::verify::SignatureVerifier;
use selector_slack::ack::AckResponder;
use selector_slack::api::{http_client, HttpResponseUrlClient, HttpSlackClientFactory, SlackApiError};
use selector_slack::respond::ResponseChannel;
use selector_slack::select::SelectCommandWorker;
use thiserror::Error;
use tracing::info;

use crate::health::{self, HealthState};
use crate::webhook::{self, WebhookState};

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
    pub dispatcher: QueuedDispatcher,
    pub runtime: DispatchRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] SlackApiError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let secrets = store_from_config(&config.secrets);
    build(config, secrets)
}

/// Wires the webhook, the dispatcher and the worker. Must be called inside a runtime.
pub fn build(
    config: AppConfig,
    secrets: Arc<dyn SecretStore>,
) -> Result<Application, BootstrapError> {
    let http = http_client(Duration::from_secs(config.slack.request_timeout_secs))
        .map_err(BootstrapError::HttpClient)?;

    let clients = HttpSlackClientFactory::from_config(&config, http.clone(), secrets.clone());
    let responses = ResponseChannel::new(Arc::new(HttpResponseUrlClient::new(http)));
    let worker = SelectCommandWorker::new(Arc::new(clients), responses);

    let (dispatcher, runtime) = QueuedDispatcher::spawn(
        Arc::new(worker),
        DispatchPolicy::from(&config.dispatch),
        config.dispatch.queue_capacity,
    );
    info!(
        event_name = "system.bootstrap.dispatcher_started",
        correlation_id = "bootstrap",
        queue_capacity = config.dispatch.queue_capacity,
        retry_attempts = config.dispatch.retry_attempts,
        "dispatcher started"
    );

    let webhook_state = WebhookState {
        secrets,
        secret_name: config.secrets.secret_name.clone(),
        signing_secret_key: config.secrets.signing_secret_key.clone(),
        verifier: SignatureVerifier::new(config.verification.freshness_window_secs),
        responder: AckResponder::new(Arc::new(dispatcher.clone()), config.slack.command.clone()),
        ack_budget: Duration::from_millis(config.ack.budget_ms),
    };
    let router = webhook::router(webhook_state)
        .merge(health::router(HealthState::new(dispatcher.clone())));

    Ok(Application { config, router, dispatcher, runtime })
}

use std::sync::Arc;

use async_trait::async_trait;
use selector_core::dispatch::CommandWorker;
use selector_core::domain::command::Command;
use selector_core::domain::selection::SelectionOutcome;
use selector_core::errors::{SelectionError, WorkerError};
use selector_core::selector::Selector;
use tracing::{error, info, warn};

use crate::api::SlackClientFactory;
use crate::blocks::{private_notice, selection_announcement};
use crate::membership::MembershipResolver;
use crate::respond::ResponseChannel;

/// Slow path of `/select`: resolve membership, pick, announce.
///
/// Selection failures are answered privately and count as a completed run. Only a
/// failed private delivery is returned as a [`WorkerError`], which lets the
/// dispatcher retry the whole command.
pub struct SelectCommandWorker {
    clients: Arc<dyn SlackClientFactory>,
    responses: ResponseChannel,
    selector: Selector,
}

impl SelectCommandWorker {
    pub fn new(clients: Arc<dyn SlackClientFactory>, responses: ResponseChannel) -> Self {
        Self { clients, responses, selector: Selector::new() }
    }

    async fn reply_privately(
        &self,
        command: &Command,
        failure: &SelectionError,
    ) -> Result<(), WorkerError> {
        self.responses
            .post_private(&command.response_url, &private_notice(failure.user_message()))
            .await
            .map_err(|error| WorkerError::Delivery(error.to_string()))
    }
}

#[async_trait]
impl CommandWorker for SelectCommandWorker {
    async fn execute(&self, command: Command) -> Result<(), WorkerError> {
        if command.response_url.trim().is_empty() {
            return Err(WorkerError::Payload("command has no response_url".to_owned()));
        }

        let correlation_id = command.correlation_id().to_owned();
        info!(
            event_name = "worker.select.started",
            correlation_id = %correlation_id,
            group_id = %command.channel_id,
            user_id = %command.user_id,
            "select command started"
        );

        let api = match self.clients.web_api().await {
            Ok(api) => api,
            Err(client_error) => {
                error!(
                    event_name = "worker.select.client_unavailable",
                    correlation_id = %correlation_id,
                    error = %client_error,
                    "could not build slack client"
                );
                let failure = SelectionError::Generic(client_error.to_string());
                return self.reply_privately(&command, &failure).await;
            }
        };

        let resolver = MembershipResolver::new(api.as_ref());
        let outcome = match resolver.resolve(&command.channel_id).await {
            Ok(membership) => self.selector.select(&membership, &command),
            Err(failure) => SelectionOutcome::Failed(failure),
        };

        let label = outcome.label();
        let failure = match outcome {
            SelectionOutcome::Selected(selection) => {
                let message = selection_announcement(&selection);
                let posted =
                    self.responses.post_to_group(api.as_ref(), &selection.group_id, &message).await;
                match posted {
                    Ok(()) => {
                        info!(
                            event_name = "worker.select.completed",
                            correlation_id = %correlation_id,
                            group_id = %selection.group_id,
                            participant_id = %selection.participant_id,
                            outcome = label,
                            "user selected"
                        );
                        return Ok(());
                    }
                    Err(post_error) => SelectionError::Generic(post_error.to_string()),
                }
            }
            SelectionOutcome::Failed(failure) => failure,
        };

        match &failure {
            SelectionError::AccessDenied { group_id } => warn!(
                event_name = "worker.select.access_denied",
                correlation_id = %correlation_id,
                group_id = %group_id,
                "not a member of the private group"
            ),
            SelectionError::Generic(detail) => error!(
                event_name = "worker.select.failed",
                correlation_id = %correlation_id,
                group_id = %command.channel_id,
                error = %detail,
                "selection failed"
            ),
        }
        self.reply_privately(&command, &failure).await
    }
}

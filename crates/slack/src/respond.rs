use std::sync::Arc;

use selector_core::domain::command::GroupId;
use tracing::info;

use crate::api::{ResponseUrlClient, SlackApiError, SlackWebApi};
use crate::blocks::{MessageTemplate, ResponsePayload};

/// The two delivery modes: a public post to the group, or an ephemeral reply through
/// the command's `response_url`.
///
/// A `response_url` is single-use and expires. A late or repeated post can fail on
/// the provider side; that failure is returned to the caller like any other.
#[derive(Clone)]
pub struct ResponseChannel {
    response_urls: Arc<dyn ResponseUrlClient>,
}

impl ResponseChannel {
    pub fn new(response_urls: Arc<dyn ResponseUrlClient>) -> Self {
        Self { response_urls }
    }

    pub async fn post_to_group(
        &self,
        api: &dyn SlackWebApi,
        group_id: &GroupId,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        api.post_message(group_id, message).await?;
        info!(
            event_name = "worker.select.posted_to_group",
            group_id = %group_id,
            "announcement posted"
        );
        Ok(())
    }

    pub async fn post_private(
        &self,
        response_url: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let payload = ResponsePayload::ephemeral(message.clone());
        self.response_urls.post(response_url, &payload).await?;
        info!(event_name = "worker.select.posted_private", "private reply delivered");
        Ok(())
    }
}

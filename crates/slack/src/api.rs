//! Slack Web API access.
//!
//! The worker never builds an HTTP client itself. It asks a [`SlackClientFactory`]
//! for a [`SlackWebApi`] once per invocation; the HTTP factory reads the bot token
//! from the secret store at that moment, so rotated tokens are picked up without a
//! restart. Tests substitute in-memory implementations of the same traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use selector_core::config::AppConfig;
use selector_core::domain::command::{GroupId, UserId};
use selector_core::secrets::SecretStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::blocks::{MessageTemplate, ResponsePayload};

pub const CONVERSATIONS_MEMBERS: &str = "conversations.members";
pub const USERS_INFO: &str = "users.info";
pub const CHAT_POST_MESSAGE: &str = "chat.postMessage";
pub const RESPONSE_URL: &str = "response_url";

const MEMBERS_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("{method} request failed: {detail}")]
    Transport { method: &'static str, detail: String },
    #[error("{method} returned HTTP {status}")]
    Status { method: &'static str, status: u16 },
    #[error("{method} failed with `{code}`")]
    Platform { method: &'static str, code: String },
    #[error("{method} response could not be decoded: {detail}")]
    Decode { method: &'static str, detail: String },
    #[error("bot token unavailable: {0}")]
    Credentials(String),
}

impl SlackApiError {
    /// True when `method` reported the platform error `code` (`{"ok": false, "error": code}`).
    pub fn is_platform(&self, method: &str, code: &str) -> bool {
        matches!(self, Self::Platform { method: m, code: c } if *m == method && c == code)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembersPage {
    /// `None` when the provider answered without a member list at all.
    pub members: Option<Vec<UserId>>,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub id: UserId,
    pub is_bot: bool,
}

#[async_trait]
pub trait SlackWebApi: Send + Sync {
    async fn conversation_members(
        &self,
        group_id: &GroupId,
        cursor: Option<&str>,
    ) -> Result<MembersPage, SlackApiError>;

    async fn user_info(&self, user_id: &UserId) -> Result<UserInfo, SlackApiError>;

    async fn post_message(
        &self,
        group_id: &GroupId,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError>;
}

/// Posts to the single-use `response_url` of a slash command.
#[async_trait]
pub trait ResponseUrlClient: Send + Sync {
    async fn post(&self, response_url: &str, payload: &ResponsePayload)
        -> Result<(), SlackApiError>;
}

#[async_trait]
pub trait SlackClientFactory: Send + Sync {
    async fn web_api(&self) -> Result<Arc<dyn SlackWebApi>, SlackApiError>;
}

pub fn http_client(timeout: Duration) -> Result<Client, SlackApiError> {
    Client::builder().timeout(timeout).build().map_err(|error| SlackApiError::Transport {
        method: "client",
        detail: error.to_string(),
    })
}

pub struct HttpSlackClientFactory {
    http: Client,
    base_url: String,
    secrets: Arc<dyn SecretStore>,
    secret_name: String,
    bot_token_key: String,
}

impl HttpSlackClientFactory {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        secrets: Arc<dyn SecretStore>,
        secret_name: impl Into<String>,
        bot_token_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            secrets,
            secret_name: secret_name.into(),
            bot_token_key: bot_token_key.into(),
        }
    }

    pub fn from_config(config: &AppConfig, http: Client, secrets: Arc<dyn SecretStore>) -> Self {
        Self::new(
            http,
            config.slack.api_base_url.clone(),
            secrets,
            config.secrets.secret_name.clone(),
            config.secrets.bot_token_key.clone(),
        )
    }
}

#[async_trait]
impl SlackClientFactory for HttpSlackClientFactory {
    async fn web_api(&self) -> Result<Arc<dyn SlackWebApi>, SlackApiError> {
        let token = self
            .secrets
            .get(&self.secret_name, &self.bot_token_key)
            .await
            .map_err(|error| SlackApiError::Credentials(error.to_string()))?;
        Ok(Arc::new(HttpSlackWebApi::new(self.http.clone(), &self.base_url, token)))
    }
}

pub struct HttpSlackWebApi {
    http: Client,
    base_url: String,
    token: SecretString,
}

impl HttpSlackWebApi {
    pub fn new(http: Client, base_url: &str, token: SecretString) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_owned(), token }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

#[async_trait]
impl SlackWebApi for HttpSlackWebApi {
    async fn conversation_members(
        &self,
        group_id: &GroupId,
        cursor: Option<&str>,
    ) -> Result<MembersPage, SlackApiError> {
        let mut query = vec![
            ("channel", group_id.0.clone()),
            ("limit", MEMBERS_PAGE_LIMIT.to_string()),
        ];
        if let Some(cursor) = cursor.filter(|cursor| !cursor.is_empty()) {
            query.push(("cursor", cursor.to_owned()));
        }

        let response = self
            .http
            .get(self.url(CONVERSATIONS_MEMBERS))
            .bearer_auth(self.token.expose_secret())
            .query(&query)
            .send()
            .await
            .map_err(|error| transport(CONVERSATIONS_MEMBERS, &error))?;
        let data: MembersData = read_envelope(CONVERSATIONS_MEMBERS, response).await?;

        let next_cursor = data
            .response_metadata
            .map(|metadata| metadata.next_cursor)
            .filter(|cursor| !cursor.is_empty());
        Ok(MembersPage {
            members: data.members.map(|ids| ids.into_iter().map(UserId).collect()),
            next_cursor,
        })
    }

    async fn user_info(&self, user_id: &UserId) -> Result<UserInfo, SlackApiError> {
        let response = self
            .http
            .get(self.url(USERS_INFO))
            .bearer_auth(self.token.expose_secret())
            .query(&[("user", user_id.0.as_str())])
            .send()
            .await
            .map_err(|error| transport(USERS_INFO, &error))?;
        let data: UserData = read_envelope(USERS_INFO, response).await?;

        let user = data.user.ok_or_else(|| SlackApiError::Decode {
            method: USERS_INFO,
            detail: "response has no `user` object".to_owned(),
        })?;
        Ok(UserInfo { id: UserId(user.id), is_bot: user.is_bot })
    }

    async fn post_message(
        &self,
        group_id: &GroupId,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let body = PostMessageBody { channel: &group_id.0, message };
        let response = self
            .http
            .post(self.url(CHAT_POST_MESSAGE))
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| transport(CHAT_POST_MESSAGE, &error))?;
        let data: PostMessageData = read_envelope(CHAT_POST_MESSAGE, response).await?;
        debug!(
            event_name = "slack.chat.posted",
            group_id = %group_id,
            ts = data.ts.as_deref().unwrap_or_default(),
            "message posted to group"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct HttpResponseUrlClient {
    http: Client,
}

impl HttpResponseUrlClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ResponseUrlClient for HttpResponseUrlClient {
    async fn post(
        &self,
        response_url: &str,
        payload: &ResponsePayload,
    ) -> Result<(), SlackApiError> {
        let response = self
            .http
            .post(response_url)
            .json(payload)
            .send()
            .await
            .map_err(|error| transport(RESPONSE_URL, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackApiError::Status { method: RESPONSE_URL, status: status.as_u16() });
        }
        Ok(())
    }
}

fn transport(method: &'static str, error: &reqwest::Error) -> SlackApiError {
    SlackApiError::Transport { method, detail: error.to_string() }
}

async fn read_envelope<T>(
    method: &'static str,
    response: reqwest::Response,
) -> Result<T, SlackApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        return Err(SlackApiError::Status { method, status: status.as_u16() });
    }

    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|error| SlackApiError::Decode { method, detail: error.to_string() })?;
    if !envelope.ok {
        return Err(SlackApiError::Platform {
            method,
            code: envelope.error.unwrap_or_else(|| "unknown_error".to_owned()),
        });
    }
    Ok(envelope.data)
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: T,
}

#[derive(Deserialize)]
struct MembersData {
    #[serde(default)]
    members: Option<Vec<String>>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct UserData {
    #[serde(default)]
    user: Option<UserPayload>,
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    is_bot: bool,
}

#[derive(Deserialize)]
struct PostMessageData {
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Serialize)]
struct PostMessageBody<'a> {
    channel: &'a str,
    #[serde(flatten)]
    message: &'a MessageTemplate,
}

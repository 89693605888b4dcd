use std::fmt;

use serde::{Deserialize, Serialize};

/// Group (channel) identifier as issued by the chat provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

/// Participant (user) identifier as issued by the chat provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl UserId {
    /// Mention syntax understood by the provider (`<@U123>`).
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// A decoded slash command invocation.
///
/// Produced once per inbound request and never mutated afterwards. The JSON form of
/// this struct is the payload handed to the worker, so field names follow the
/// provider's form keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: UserId,
    pub channel_id: GroupId,
    pub response_url: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_app_id: Option<String>,
}

impl Command {
    /// The free-text argument, if the requester typed one.
    pub fn task(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn correlation_id(&self) -> &str {
        if self.trigger_id.is_empty() {
            "unknown-trigger"
        } else {
            &self.trigger_id
        }
    }
}

//! Slack side of the selector.
//!
//! - **Commands** (`commands`) - slash command form decoding
//! - **Ack** (`ack`) - the immediate reply and the non-blocking hand-off
//! - **Web API** (`api`) - `conversations.members`, `users.info`, `chat.postMessage`, `response_url`
//! - **Membership** (`membership`) - human members of a group, access classification
//! - **Respond** (`respond`) - public and ephemeral delivery
//! - **Select** (`select`) - the `/select` worker
//! - **Block Kit** (`blocks`) - message builders
//!
//! ```text
//! webhook → parse_slash_command → AckResponder ─dispatch─→ SelectCommandWorker
//!                                     ↓                        ↓
//!                               "Thinking..."     MembershipResolver → Selector → ResponseChannel
//! ```

pub mod ack;
pub mod api;
pub mod blocks;
pub mod commands;
pub mod membership;
pub mod respond;
pub mod select;

pub use ack::{Ack, AckDisposition, AckResponder};
pub use api::{
    HttpResponseUrlClient, HttpSlackClientFactory, ResponseUrlClient, SlackApiError,
    SlackClientFactory, SlackWebApi,
};
pub use commands::parse_slash_command;
pub use membership::MembershipResolver;
pub use respond::ResponseChannel;
pub use select::SelectCommandWorker;

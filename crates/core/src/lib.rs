pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod secrets;
pub mod selector;
pub mod verify;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, SecretsBackend};
pub use dispatch::{
    CommandWorker, DispatchPolicy, DispatchReceipt, DispatchRuntime, DispatchStats,
    QueuedDispatcher, TaskDispatcher,
};
pub use domain::command::{Command, GroupId, UserId};
pub use domain::membership::Membership;
pub use domain::selection::{Selection, SelectionOutcome};
pub use errors::{DispatchError, ParseError, SelectionError, VerificationError, WorkerError};
pub use secrets::{SecretError, SecretStore};
pub use selector::Selector;
pub use verify::{SignatureVerifier, VerificationContext};

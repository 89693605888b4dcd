use thiserror::Error;

use crate::domain::command::GroupId;

/// Shown privately to the requester when the app cannot list a restricted group.
pub const ACCESS_DENIED_MESSAGE: &str =
    "I must be a member of a private channel to be able to select a user.  Please invite me and try again.";

/// Shown privately to the requester for every other selection failure.
pub const GENERIC_SELECTION_MESSAGE: &str = "Failed to select user.";

/// Returned in the acknowledgment envelope when the request could not be accepted.
pub const GENERIC_ACK_FAILURE_MESSAGE: &str = "There was an error.  Please contact support.";

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("request timestamp is outside the freshness window")]
    StaleTimestamp,
    #[error("request signature does not match")]
    SignatureMismatch,
    #[error("signature or timestamp header is missing or malformed")]
    MalformedHeaders,
}

impl VerificationError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaleTimestamp => "stale_timestamp",
            Self::SignatureMismatch => "signature_mismatch",
            Self::MalformedHeaders => "malformed_headers",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("request body is not valid UTF-8 form data")]
    InvalidEncoding,
    #[error("mandatory field `{0}` is missing")]
    MissingField(&'static str),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatch queue is full")]
    QueueFull,
    #[error("dispatch queue is closed")]
    Closed,
    #[error("command payload could not be serialized: {0}")]
    Serialize(String),
}

/// Worker-side selection failures.
///
/// `AccessDenied` is raised only when the group listing itself reports that the app
/// is not a member of a restricted group. Everything else is `Generic`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("not a member of restricted group {group_id}")]
    AccessDenied { group_id: GroupId },
    #[error("selection failed: {0}")]
    Generic(String),
}

impl SelectionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => ACCESS_DENIED_MESSAGE,
            Self::Generic(_) => GENERIC_SELECTION_MESSAGE,
        }
    }
}

/// Failure of one worker attempt.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker exceeded its {secs}s timeout")]
    Timeout { secs: u64 },
    #[error("response delivery failed: {0}")]
    Delivery(String),
    #[error("worker could not prepare the command: {0}")]
    Payload(String),
}

impl WorkerError {
    /// A malformed payload fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Payload(_))
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::command::GroupId;
    use crate::errors::{SelectionError, ACCESS_DENIED_MESSAGE, GENERIC_SELECTION_MESSAGE};

    #[test]
    fn access_denied_maps_to_remediation_message() {
        let error = SelectionError::AccessDenied { group_id: GroupId("G1".to_owned()) };
        assert_eq!(error.user_message(), ACCESS_DENIED_MESSAGE);
        assert!(error.to_string().contains("G1"));
    }

    #[test]
    fn generic_error_hides_detail_from_requester() {
        let error = SelectionError::Generic("users.info returned ratelimited".to_owned());
        assert_eq!(error.user_message(), GENERIC_SELECTION_MESSAGE);
        assert!(!error.user_message().contains("ratelimited"));
    }
}

use std::sync::Arc;

use selector_core::dispatch::TaskDispatcher;
use selector_core::domain::command::Command;
use selector_core::errors::{DispatchError, GENERIC_ACK_FAILURE_MESSAGE};
use tracing::{error, info};

use crate::blocks::{ack_failure, thinking_placeholder, unsupported_command_notice, ResponsePayload};
use crate::commands::is_supported;

/// What happened to the command while the acknowledgment was built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AckDisposition {
    Dispatched { task_id: String },
    Unsupported,
    DispatchFailed(DispatchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub disposition: AckDisposition,
    pub payload: ResponsePayload,
}

/// Builds the immediate reply and submits the command for later execution.
///
/// Never awaits anything; the only side effect is one non-blocking dispatch call.
#[derive(Clone)]
pub struct AckResponder {
    dispatcher: Arc<dyn TaskDispatcher>,
    supported_command: String,
}

impl AckResponder {
    pub fn new(dispatcher: Arc<dyn TaskDispatcher>, supported_command: impl Into<String>) -> Self {
        Self { dispatcher, supported_command: supported_command.into() }
    }

    pub fn acknowledge(&self, command: &Command) -> Ack {
        if !is_supported(command, &self.supported_command) {
            info!(
                event_name = "ingress.select.unsupported",
                correlation_id = %command.correlation_id(),
                command = %command.command,
                "unsupported slash command acknowledged without dispatch"
            );
            return Ack {
                disposition: AckDisposition::Unsupported,
                payload: unsupported_command_notice(&command.command, &self.supported_command),
            };
        }

        match self.dispatcher.dispatch(command) {
            Ok(receipt) => Ack {
                disposition: AckDisposition::Dispatched { task_id: receipt.task_id },
                payload: thinking_placeholder(),
            },
            Err(dispatch_error) => {
                error!(
                    event_name = "ingress.select.dispatch_failed",
                    correlation_id = %command.correlation_id(),
                    group_id = %command.channel_id,
                    error = %dispatch_error,
                    "could not hand command to worker"
                );
                Ack {
                    disposition: AckDisposition::DispatchFailed(dispatch_error),
                    payload: ack_failure(GENERIC_ACK_FAILURE_MESSAGE),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use selector_core::dispatch::{DispatchReceipt, TaskDispatcher};
    use selector_core::domain::command::{Command, GroupId, UserId};
    use selector_core::errors::{DispatchError, GENERIC_ACK_FAILURE_MESSAGE};

    use super::{AckDisposition, AckResponder};
    use crate::blocks::{thinking_placeholder, Block, TextObject};

    #[derive(Default)]
    struct RecordingDispatcher {
        fail_with: Option<DispatchError>,
        dispatched: Mutex<Vec<String>>,
    }

    impl TaskDispatcher for RecordingDispatcher {
        fn dispatch(&self, command: &Command) -> Result<DispatchReceipt, DispatchError> {
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            self.dispatched.lock().expect("lock").push(command.trigger_id.clone());
            Ok(DispatchReceipt { task_id: format!("task-{}", command.trigger_id) })
        }
    }

    fn command(name: &str) -> Command {
        Command {
            command: name.to_owned(),
            text: "standup".to_owned(),
            user_id: UserId("U1".to_owned()),
            channel_id: GroupId("C1".to_owned()),
            response_url: "https://hooks.test/1".to_owned(),
            trigger_id: "T-9".to_owned(),
            team_id: None,
            channel_name: None,
            user_name: None,
            api_app_id: None,
        }
    }

    #[test]
    fn supported_command_is_dispatched_with_thinking_placeholder() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let responder = AckResponder::new(dispatcher.clone(), "/select");

        let ack = responder.acknowledge(&command("/select"));

        assert_eq!(ack.disposition, AckDisposition::Dispatched { task_id: "task-T-9".to_owned() });
        assert_eq!(ack.payload, thinking_placeholder());
        assert_eq!(*dispatcher.dispatched.lock().expect("lock"), vec!["T-9"]);
    }

    #[test]
    fn placeholder_carries_no_group_content() {
        let responder = AckResponder::new(Arc::new(RecordingDispatcher::default()), "/select");
        let ack = responder.acknowledge(&command("/select"));

        let rendered = serde_json::to_string(&ack.payload).expect("json");
        assert!(!rendered.contains("C1"));
        assert!(!rendered.contains("standup"));
    }

    #[test]
    fn unsupported_command_is_never_dispatched() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let responder = AckResponder::new(dispatcher.clone(), "/select");

        let ack = responder.acknowledge(&command("/pick"));

        assert_eq!(ack.disposition, AckDisposition::Unsupported);
        assert!(dispatcher.dispatched.lock().expect("lock").is_empty());
    }

    #[test]
    fn dispatch_failure_yields_generic_envelope() {
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_with: Some(DispatchError::QueueFull),
            ..RecordingDispatcher::default()
        });
        let responder = AckResponder::new(dispatcher, "/select");

        let ack = responder.acknowledge(&command("/select"));

        assert_eq!(ack.disposition, AckDisposition::DispatchFailed(DispatchError::QueueFull));
        assert!(matches!(
            &ack.payload.blocks[0],
            Block::Section { text: TextObject::Mrkdwn { text }, .. }
                if text == GENERIC_ACK_FAILURE_MESSAGE
        ));
    }
}

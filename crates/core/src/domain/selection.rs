use crate::domain::command::{GroupId, UserId};
use crate::errors::SelectionError;

/// A successful pick, with everything needed to announce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub group_id: GroupId,
    pub requester_id: UserId,
    pub participant_id: UserId,
    pub task: Option<String>,
}

impl Selection {
    /// `<@requester> asked me to select someone[ to do "<task>"]`
    pub fn attribution_line(&self) -> String {
        let mut line = format!("{} asked me to select someone", self.requester_id.mention());
        if let Some(task) = &self.task {
            line.push_str(&format!(" to do \"{task}\""));
        }
        line
    }

    pub fn selection_line(&self) -> String {
        format!("I have selected {}", self.participant_id.mention())
    }

    /// Plain text used by clients that cannot render blocks.
    pub fn fallback_text(&self) -> String {
        format!("Selected user is {}", self.participant_id.mention())
    }
}

/// Result of one selection. Produced once, consumed once by the response channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    Selected(Selection),
    Failed(SelectionError),
}

impl SelectionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Selected(_) => "selected",
            Self::Failed(SelectionError::AccessDenied { .. }) => "access_denied",
            Self::Failed(SelectionError::Generic(_)) => "generic_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Selection, SelectionOutcome};
    use crate::domain::command::{GroupId, UserId};
    use crate::errors::SelectionError;

    fn selection(task: Option<&str>) -> Selection {
        Selection {
            group_id: GroupId("C1".to_owned()),
            requester_id: UserId("U1".to_owned()),
            participant_id: UserId("U2".to_owned()),
            task: task.map(str::to_owned),
        }
    }

    #[test]
    fn attribution_mentions_requester_and_task() {
        assert_eq!(
            selection(Some("review the PR")).attribution_line(),
            "<@U1> asked me to select someone to do \"review the PR\""
        );
        assert_eq!(selection(None).attribution_line(), "<@U1> asked me to select someone");
    }

    #[test]
    fn selection_and_fallback_mention_chosen_participant() {
        let selection = selection(None);
        assert_eq!(selection.selection_line(), "I have selected <@U2>");
        assert_eq!(selection.fallback_text(), "Selected user is <@U2>");
    }

    #[test]
    fn outcome_labels_name_each_branch() {
        assert_eq!(SelectionOutcome::Selected(selection(None)).label(), "selected");
        assert_eq!(
            SelectionOutcome::Failed(SelectionError::AccessDenied {
                group_id: GroupId("G1".to_owned())
            })
            .label(),
            "access_denied"
        );
        assert_eq!(
            SelectionOutcome::Failed(SelectionError::Generic("boom".to_owned())).label(),
            "generic_error"
        );
    }
}

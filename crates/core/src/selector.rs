use rand::Rng;

use crate::domain::command::Command;
use crate::domain::membership::Membership;
use crate::domain::selection::{Selection, SelectionOutcome};
use crate::errors::SelectionError;

/// Uniform random pick over a resolved membership.
///
/// Uses the thread-local CSPRNG, so repeated picks over the same membership are
/// independent. There is no seed and no way to replay a selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct Selector;

impl Selector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, membership: &Membership, command: &Command) -> SelectionOutcome {
        self.select_with(&mut rand::thread_rng(), membership, command)
    }

    pub fn select_with<R>(
        &self,
        rng: &mut R,
        membership: &Membership,
        command: &Command,
    ) -> SelectionOutcome
    where
        R: Rng + ?Sized,
    {
        if membership.is_empty() {
            return SelectionOutcome::Failed(SelectionError::Generic(format!(
                "no eligible participants in group {}",
                membership.group_id()
            )));
        }

        let index = rng.gen_range(0..membership.len());
        SelectionOutcome::Selected(Selection {
            group_id: membership.group_id().clone(),
            requester_id: command.user_id.clone(),
            participant_id: membership.participants()[index].clone(),
            task: command.task().map(str::to_owned),
        })
    }
}

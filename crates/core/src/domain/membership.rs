use std::collections::HashSet;

use crate::domain::command::{GroupId, UserId};

/// Eligible (non-automated) participants of a group.
///
/// Recomputed for every selection. Insertion order is kept only so that logs are
/// stable; callers must treat it as a set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    group_id: GroupId,
    participants: Vec<UserId>,
    seen: HashSet<UserId>,
}

impl Membership {
    pub fn empty(group_id: GroupId) -> Self {
        Self { group_id, participants: Vec::new(), seen: HashSet::new() }
    }

    pub fn from_participants(
        group_id: GroupId,
        participants: impl IntoIterator<Item = UserId>,
    ) -> Self {
        let mut membership = Self::empty(group_id);
        for participant in participants {
            membership.insert(participant);
        }
        membership
    }

    /// Returns `false` when the participant was already present.
    pub fn insert(&mut self, participant: UserId) -> bool {
        if !self.seen.insert(participant.clone()) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    pub fn contains(&self, participant: &UserId) -> bool {
        self.seen.contains(participant)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Membership;
    use crate::domain::command::{GroupId, UserId};

    #[test]
    fn duplicate_participants_collapse() {
        let membership = Membership::from_participants(
            GroupId("C1".to_owned()),
            ["U1", "U2", "U1"].map(|id| UserId(id.to_owned())),
        );

        assert_eq!(membership.len(), 2);
        assert!(membership.contains(&UserId("U2".to_owned())));
    }

    #[test]
    fn large_listings_keep_first_seen_order() {
        let ids: Vec<UserId> = (0..20_000).map(|n| UserId(format!("U{}", n % 5_000))).collect();
        let membership = Membership::from_participants(GroupId("C1".to_owned()), ids);

        assert_eq!(membership.len(), 5_000);
        assert_eq!(membership.participants()[0], UserId("U0".to_owned()));
        assert_eq!(membership.participants()[4_999], UserId("U4999".to_owned()));
        assert!(membership.contains(&UserId("U1234".to_owned())));
        assert!(!membership.contains(&UserId("U5000".to_owned())));
    }
}

use selector_core::domain::command::GroupId;
use selector_core::domain::membership::Membership;
use selector_core::errors::SelectionError;
use tracing::{debug, warn};

use crate::api::{SlackApiError, SlackWebApi, CONVERSATIONS_MEMBERS};

/// Platform error returned by `conversations.members` when the app is not in a private group.
pub const NOT_A_MEMBER_CODE: &str = "channel_not_found";

const MAX_MEMBER_PAGES: usize = 100;

/// Lists the human members of a group.
///
/// Recomputed for every command; nothing is cached. Only the listing call can yield
/// [`SelectionError::AccessDenied`], and only for [`NOT_A_MEMBER_CODE`]. Every other
/// provider failure, including a failing per-user lookup, is `Generic`.
pub struct MembershipResolver<'a> {
    api: &'a dyn SlackWebApi,
}

impl<'a> MembershipResolver<'a> {
    pub fn new(api: &'a dyn SlackWebApi) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, group_id: &GroupId) -> Result<Membership, SelectionError> {
        let mut membership = Membership::empty(group_id.clone());
        let mut cursor: Option<String> = None;

        for page_number in 0..MAX_MEMBER_PAGES {
            let page = self
                .api
                .conversation_members(group_id, cursor.as_deref())
                .await
                .map_err(|error| classify_listing_error(group_id, error))?;

            let Some(members) = page.members else {
                warn!(
                    event_name = "worker.select.members_unavailable",
                    group_id = %group_id,
                    page_number,
                    "provider returned no member list; continuing with what was resolved"
                );
                return Ok(membership);
            };

            for member in members {
                let info = self.api.user_info(&member).await.map_err(|error| {
                    SelectionError::Generic(format!("lookup of {member} failed: {error}"))
                })?;
                if info.is_bot {
                    warn!(
                        event_name = "worker.select.bot_skipped",
                        group_id = %group_id,
                        user_id = %member,
                        "ignoring bot user"
                    );
                    continue;
                }
                membership.insert(member);
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    debug!(
                        event_name = "worker.select.members_resolved",
                        group_id = %group_id,
                        members = membership.len(),
                        pages = page_number + 1,
                        "membership resolved"
                    );
                    return Ok(membership);
                }
            }
        }

        warn!(
            event_name = "worker.select.members_truncated",
            group_id = %group_id,
            max_pages = MAX_MEMBER_PAGES,
            "member listing did not finish; using the pages read so far"
        );
        Ok(membership)
    }
}

fn classify_listing_error(group_id: &GroupId, error: SlackApiError) -> SelectionError {
    if error.is_platform(CONVERSATIONS_MEMBERS, NOT_A_MEMBER_CODE) {
        SelectionError::AccessDenied { group_id: group_id.clone() }
    } else {
        SelectionError::Generic(error.to_string())
    }
}

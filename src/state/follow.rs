use crate::application_port::RelationshipService;
use crate::domain_model::*;
use crate::logger::*;
use crate::state::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Follow state of every profile looked at so far.
/// `none -> requested -> following`, with cancel and unfollow going back.
pub struct FollowBook {
    relations: Arc<dyn RelationshipService>,
    gate: ActionGate,
    state: StateCell<HashMap<UserId, FollowStatus>>,
    busy: PendingSet<UserId>,
}

impl FollowBook {
    pub fn new(relations: Arc<dyn RelationshipService>, gate: ActionGate) -> Self {
        FollowBook {
            relations,
            gate,
            state: StateCell::default(),
            busy: PendingSet::new(),
        }
    }

    pub fn status(&self, other: UserId) -> FollowStatus {
        self.state
            .read(|s| s.get(&other).copied().unwrap_or_default())
    }

    pub fn is_busy(&self, other: UserId) -> bool {
        self.busy.is_pending(&other)
    }

    /// Fetches the status. Failures read as `none`.
    pub async fn refresh(&self, other: UserId) -> FollowStatus {
        let status = match self.relations.follow_status(other).await {
            Ok(status) => status,
            Err(e) => {
                debug!(user = %other, error = %e, "follow status unavailable");
                FollowStatus::None
            }
        };
        self.state.update(|s| s.insert(other, status));
        status
    }

    pub async fn request(&self, other: UserId) -> Result<FollowStatus, ActionError> {
        self.gate.require_user()?;
        let _busy = self.gate.begin(&self.busy, other)?;

        let result = reconcile(
            &self.state,
            |s| s.get(&other).copied(),
            |s| {
                s.insert(other, FollowStatus::Requested);
            },
            self.relations.request_follow(other),
            |_, ()| FollowStatus::Requested,
            |s, previous| {
                match previous {
                    Some(previous) => s.insert(other, previous),
                    None => s.remove(&other),
                };
            },
        )
        .await;

        self.gate
            .report(result, Some("Follow request sent"), "Could not send the request")
    }

    pub async fn cancel_request(&self, other: UserId) -> Result<FollowStatus, ActionError> {
        self.gate.require_user()?;
        let _busy = self.gate.begin(&self.busy, other)?;

        let result = self.relations.cancel_request(other).await;
        self.gate
            .report(result, Some("Request cancelled"), "Could not cancel the request")?;
        self.state.update(|s| s.insert(other, FollowStatus::None));
        Ok(FollowStatus::None)
    }

    pub async fn unfollow(&self, other: UserId) -> Result<FollowStatus, ActionError> {
        self.gate.require_user()?;
        let _busy = self.gate.begin(&self.busy, other)?;

        let result = self.relations.unfollow(other).await;
        self.gate
            .report(result, Some("Unfollowed"), "Could not unfollow")?;
        self.state.update(|s| s.insert(other, FollowStatus::None));
        Ok(FollowStatus::None)
    }
}

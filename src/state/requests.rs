use crate::application_port::RelationshipService;
use crate::domain_model::*;
use crate::state::*;
use std::sync::Arc;

/// Follow requests waiting for the signed-in user's decision.
pub struct IncomingRequests {
    relations: Arc<dyn RelationshipService>,
    gate: ActionGate,
    state: StateCell<Vec<FollowRequest>>,
    processing: PendingSet<RequestId>,
}

impl IncomingRequests {
    pub fn new(relations: Arc<dyn RelationshipService>, gate: ActionGate) -> Self {
        IncomingRequests {
            relations,
            gate,
            state: StateCell::default(),
            processing: PendingSet::new(),
        }
    }

    pub fn list(&self) -> Vec<FollowRequest> {
        self.state.snapshot()
    }

    pub fn is_processing(&self, request: RequestId) -> bool {
        self.processing.is_pending(&request)
    }

    pub async fn load(&self) -> Result<(), ActionError> {
        self.gate.require_user()?;
        let result = self.relations.incoming().await;
        let requests = self.gate.report(result, None, "Could not load requests")?;
        self.state.update(|s| *s = requests);
        Ok(())
    }

    pub async fn accept(&self, request: RequestId) -> Result<(), ActionError> {
        self.decide(request, RequestDecision::Accept).await
    }

    pub async fn reject(&self, request: RequestId) -> Result<(), ActionError> {
        self.decide(request, RequestDecision::Reject).await
    }

    async fn decide(&self, request: RequestId, decision: RequestDecision) -> Result<(), ActionError> {
        self.gate.require_user()?;
        let _processing = self.gate.begin(&self.processing, request)?;

        let result = reconcile(
            &self.state,
            |s| {
                s.iter()
                    .position(|r| r.id == request)
                    .map(|i| (i, s[i].clone()))
            },
            |s| s.retain(|r| r.id != request),
            self.relations.decide(request, decision),
            |_, ()| (),
            |s, removed| {
                if let Some((index, entry)) = removed {
                    s.insert(index.min(s.len()), entry);
                }
            },
        )
        .await;

        let (success, failure) = match decision {
            RequestDecision::Accept => ("Request accepted", "Could not accept the request"),
            RequestDecision::Reject => ("Request rejected", "Could not reject the request"),
        };
        self.gate.report(result, Some(success), failure)
    }
}

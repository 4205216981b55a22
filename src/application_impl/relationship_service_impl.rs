use crate::application_port::RelationshipService;
use crate::client::*;
use crate::domain_model::*;

pub struct RealRelationshipService {
    client: ApiClient,
}

impl RealRelationshipService {
    pub fn new(client: ApiClient) -> RealRelationshipService {
        RealRelationshipService { client }
    }
}

#[async_trait::async_trait]
impl RelationshipService for RealRelationshipService {
    async fn follow_status(&self, other: UserId) -> Result<FollowStatus, ApiError> {
        let response: Option<FollowStatusResponse> = self
            .client
            .get(&format!("/api/users/{other}/follow-status"))
            .await?;
        Ok(response.unwrap_or_default().status)
    }

    async fn request_follow(&self, other: UserId) -> Result<(), ApiError> {
        self.client
            .post_empty(&format!("/api/users/{other}/request"))
            .await
    }

    async fn cancel_request(&self, other: UserId) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/users/{other}/request")).await
    }

    async fn unfollow(&self, other: UserId) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/users/{other}/follow")).await
    }

    async fn incoming(&self) -> Result<Vec<FollowRequest>, ApiError> {
        let requests: Option<Vec<FollowRequest>> = self.client.get("/api/requests").await?;
        Ok(requests.unwrap_or_default())
    }

    async fn decide(&self, request: RequestId, decision: RequestDecision) -> Result<(), ApiError> {
        self.client
            .post_empty(&format!("/api/requests/{request}/{}", decision.as_path()))
            .await
    }
}

use crate::client::ApiError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait RelationshipService: Send + Sync {
    async fn follow_status(&self, other: UserId) -> Result<FollowStatus, ApiError>;
    async fn request_follow(&self, other: UserId) -> Result<(), ApiError>;
    async fn cancel_request(&self, other: UserId) -> Result<(), ApiError>;
    async fn unfollow(&self, other: UserId) -> Result<(), ApiError>;
    async fn incoming(&self) -> Result<Vec<FollowRequest>, ApiError>;
    async fn decide(&self, request: RequestId, decision: RequestDecision) -> Result<(), ApiError>;
}

use crate::client::ApiError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn list(&self) -> Result<Vec<User>, ApiError>;
    async fn get(&self, user: UserId) -> Result<User, ApiError>;
    async fn update(&self, user: UserId, update: &ProfileUpdate) -> Result<User, ApiError>;
}

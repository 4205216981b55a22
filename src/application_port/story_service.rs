use crate::client::ApiError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait StoryService: Send + Sync {
    async fn list(&self) -> Result<Vec<Story>, ApiError>;
    async fn create(&self, story: &NewStory) -> Result<Story, ApiError>;
    async fn delete(&self, story: StoryId) -> Result<(), ApiError>;
}

use crate::application_port::StoryService;
use crate::client::*;
use crate::domain_model::*;

pub struct RealStoryService {
    client: ApiClient,
}

impl RealStoryService {
    pub fn new(client: ApiClient) -> RealStoryService {
        RealStoryService { client }
    }
}

#[async_trait::async_trait]
impl StoryService for RealStoryService {
    async fn list(&self) -> Result<Vec<Story>, ApiError> {
        let stories: Option<Vec<Story>> = self.client.get("/api/stories").await?;
        Ok(stories.unwrap_or_default())
    }

    async fn create(&self, story: &NewStory) -> Result<Story, ApiError> {
        self.client.post("/api/stories", story).await
    }

    async fn delete(&self, story: StoryId) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/stories/{story}")).await
    }
}

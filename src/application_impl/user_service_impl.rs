use crate::application_port::UserService;
use crate::client::*;
use crate::domain_model::*;

pub struct RealUserService {
    client: ApiClient,
}

impl RealUserService {
    pub fn new(client: ApiClient) -> RealUserService {
        RealUserService { client }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn list(&self) -> Result<Vec<User>, ApiError> {
        let users: Option<Vec<User>> = self.client.get("/api/users").await?;
        Ok(users.unwrap_or_default())
    }

    async fn get(&self, user: UserId) -> Result<User, ApiError> {
        self.client.get(&format!("/api/users/{user}")).await
    }

    async fn update(&self, user: UserId, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.client.patch(&format!("/api/users/{user}"), update).await
    }
}

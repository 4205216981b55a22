use crate::application_port::AuthService;
use crate::client::*;
use crate::domain_model::*;

pub struct RealAuthService {
    client: ApiClient,
}

impl RealAuthService {
    pub fn new(client: ApiClient) -> RealAuthService {
        RealAuthService { client }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn me(&self) -> Result<User, ApiError> {
        self.client.get("/api/auth/me").await
    }

    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        let request = ApiRequest::post("/api/auth/login").json(credentials)?;
        self.client.send_unauthenticated(request).await?.json()
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post("/api/auth/register").json(registration)?;
        self.client.send_unauthenticated(request).await?;
        Ok(())
    }

    async fn logout(&self, refresh_token: Option<&RefreshToken>) -> Result<(), ApiError> {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        self.client.execute(ApiRequest::post("/api/auth/logout").json(&body)?).await?;
        Ok(())
    }
}

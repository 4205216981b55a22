use crate::client::ApiError;
use crate::domain_model::*;
use crate::domain_port::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("login response carried no token")]
    MissingToken,
}

impl AuthError {
    pub fn notice(&self, fallback: &str) -> String {
        match self {
            AuthError::Api(e) => e.notice(fallback),
            _ => fallback.to_owned(),
        }
    }
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn me(&self) -> Result<User, ApiError>;
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError>;
    async fn register(&self, registration: &Registration) -> Result<(), ApiError>;
    async fn logout(&self, refresh_token: Option<&RefreshToken>) -> Result<(), ApiError>;
}

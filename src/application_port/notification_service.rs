use crate::client::ApiError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    async fn list(&self) -> Result<Vec<Notification>, ApiError>;
    async fn mark_read(&self, notification: NotificationId) -> Result<(), ApiError>;
}

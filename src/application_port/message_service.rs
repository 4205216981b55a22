use crate::client::ApiError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait MessageService: Send + Sync {
    async fn inbox(&self) -> Result<Vec<Message>, ApiError>;
    async fn thread(&self, other: UserId) -> Result<Vec<Message>, ApiError>;
    /// Some backends answer a send with an empty body.
    async fn send(&self, message: &OutgoingMessage) -> Result<Option<Message>, ApiError>;
    async fn edit(&self, message: MessageId, content: &str) -> Result<(), ApiError>;
    async fn delete(&self, message: MessageId) -> Result<(), ApiError>;
    async fn mark_thread_read(&self, other: UserId) -> Result<(), ApiError>;
}

use crate::application_port::MessageService;
use crate::client::*;
use crate::domain_model::*;

pub struct RealMessageService {
    client: ApiClient,
}

impl RealMessageService {
    pub fn new(client: ApiClient) -> RealMessageService {
        RealMessageService { client }
    }
}

#[async_trait::async_trait]
impl MessageService for RealMessageService {
    async fn inbox(&self) -> Result<Vec<Message>, ApiError> {
        let inbox: Option<Vec<Message>> = self.client.get("/api/messages").await?;
        Ok(inbox.unwrap_or_default())
    }

    async fn thread(&self, other: UserId) -> Result<Vec<Message>, ApiError> {
        let thread: Option<Vec<Message>> = self
            .client
            .get(&format!("/api/messages/thread/{other}"))
            .await?;
        Ok(thread.unwrap_or_default())
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<Option<Message>, ApiError> {
        let request = ApiRequest::post("/api/messages").json(message)?;
        let response = self.client.execute(request).await?;
        // an unexpected shape is still a delivered message
        Ok(response.json::<Option<Message>>().ok().flatten())
    }

    async fn edit(&self, message: MessageId, content: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "content": content });
        let request = ApiRequest::put(format!("/api/messages/{message}")).json(&body)?;
        self.client.execute(request).await?;
        Ok(())
    }

    async fn delete(&self, message: MessageId) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/messages/{message}")).await
    }

    async fn mark_thread_read(&self, other: UserId) -> Result<(), ApiError> {
        self.client
            .post_empty(&format!("/api/messages/thread/{other}/read"))
            .await
    }
}

use crate::application_port::NotificationService;
use crate::client::*;
use crate::domain_model::*;

pub struct RealNotificationService {
    client: ApiClient,
}

impl RealNotificationService {
    pub fn new(client: ApiClient) -> RealNotificationService {
        RealNotificationService { client }
    }
}

#[async_trait::async_trait]
impl NotificationService for RealNotificationService {
    async fn list(&self) -> Result<Vec<Notification>, ApiError> {
        let list: Option<Vec<Notification>> = self.client.get("/api/notifications").await?;
        Ok(list.unwrap_or_default())
    }

    async fn mark_read(&self, notification: NotificationId) -> Result<(), ApiError> {
        self.client
            .post_empty(&format!("/api/notifications/{notification}/read"))
            .await
    }
}

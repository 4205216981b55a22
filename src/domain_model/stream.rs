use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames pushed by the backend over the realtime socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
pub enum ServerEvent {
    Notification(NotificationEvent),
    MessagesRead(MessagesRead),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(default)]
    pub id: Option<NotificationId>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NotificationEvent {
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: self.id.unwrap_or(NotificationId(now.timestamp_millis())),
            kind: self.kind.unwrap_or_else(|| "event".to_owned()),
            payload: self.payload,
            read: self.read.unwrap_or(false),
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

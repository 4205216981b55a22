use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Author,
    #[serde(default)]
    pub recipient: Option<Author>,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "isRead")]
    pub read: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub recipient_id: UserId,
    pub content: String,
}

/// Inbox messages grouped per sender, each thread oldest first.
/// Senders keep the order in which they first appear in the inbox.
pub fn group_by_sender(inbox: &[Message]) -> Vec<(UserId, Vec<Message>)> {
    let mut threads: Vec<(UserId, Vec<Message>)> = Vec::new();
    for message in inbox {
        match threads.iter_mut().find(|(id, _)| *id == message.sender.id) {
            Some((_, thread)) => thread.push(message.clone()),
            None => threads.push((message.sender.id, vec![message.clone()])),
        }
    }
    for (_, thread) in threads.iter_mut() {
        thread.sort_by_key(|m| m.created_at);
    }
    threads
}

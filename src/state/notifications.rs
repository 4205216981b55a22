use crate::application_port::NotificationService;
use crate::client::{ServerEventHandler, SessionStore};
use crate::domain_model::*;
use crate::logger::*;
use crate::state::*;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait MessagesReadListener: Send + Sync {
    fn on_messages_read(&self, receipt: &MessagesRead);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Notification list fed by the initial fetch and the realtime socket.
pub struct NotificationCenter {
    notifications: Arc<dyn NotificationService>,
    session: Arc<SessionStore>,
    state: StateCell<Vec<Notification>>,
    listeners: DashMap<ListenerId, Arc<dyn MessagesReadListener>>,
    next_listener: AtomicU64,
}

impl NotificationCenter {
    pub fn new(notifications: Arc<dyn NotificationService>, session: Arc<SessionStore>) -> Self {
        NotificationCenter {
            notifications,
            session,
            state: StateCell::default(),
            listeners: DashMap::new(),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn list(&self) -> Vec<Notification> {
        self.state.snapshot()
    }

    pub fn unread_count(&self) -> usize {
        self.state.read(|s| s.iter().filter(|n| !n.read).count())
    }

    /// Only fetches when a token is stored.
    pub async fn load(&self) {
        if self.session.access_token().is_none() {
            return;
        }
        match self.notifications.list().await {
            Ok(list) => self.state.update(|s| *s = list),
            Err(e) => warn!(error = %e, "fetch notifications failed"),
        }
    }

    /// Flags the notification read once the server agrees. Failures are dropped.
    pub async fn mark_as_read(&self, id: NotificationId) {
        match self.notifications.mark_read(id).await {
            Ok(()) => self.state.update(|s| {
                if let Some(n) = s.iter_mut().find(|n| n.id == id) {
                    n.read = true;
                }
            }),
            Err(e) => debug!(notification = %id, error = %e, "mark read failed"),
        }
    }

    pub fn push(&self, event: NotificationEvent) -> Notification {
        let notification = event.into_notification(Utc::now());
        self.state.update(|s| s.insert(0, notification.clone()));
        notification
    }

    pub fn add_messages_read_listener(&self, listener: Arc<dyn MessagesReadListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, listener);
        id
    }

    pub fn remove_messages_read_listener(&self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn dispatch_messages_read(&self, receipt: &MessagesRead) {
        let listeners: Vec<_> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for listener in listeners {
            listener.on_messages_read(receipt);
        }
    }
}

#[async_trait::async_trait]
impl ServerEventHandler for NotificationCenter {
    async fn handle(&self, event: ServerEvent) {
        match event {
            ServerEvent::Notification(event) => {
                let notification = self.push(event);
                debug!(notification = %notification.id, kind = %notification.kind, "notification received");
            }
            ServerEvent::MessagesRead(receipt) => {
                debug!(by = %receipt.by, "messages read");
                self.dispatch_messages_read(&receipt);
            }
        }
    }
}

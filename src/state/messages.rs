use crate::application_port::{MessageService, UserService};
use crate::domain_model::*;
use crate::logger::*;
use crate::state::*;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MessagesState {
    pub inbox: Vec<Message>,
    pub selected: Option<UserId>,
    pub peer: Option<User>,
    pub thread: Vec<Message>,
}

/// Inbox, the open conversation and its read receipts.
pub struct MessagesView {
    messages: Arc<dyn MessageService>,
    users: Arc<dyn UserService>,
    gate: ActionGate,
    confirm: Arc<dyn Confirm>,
    ids: Arc<LocalIdSource>,
    state: StateCell<MessagesState>,
    sending: PendingSet<UserId>,
}

impl MessagesView {
    pub fn new(
        messages: Arc<dyn MessageService>,
        users: Arc<dyn UserService>,
        gate: ActionGate,
        confirm: Arc<dyn Confirm>,
        ids: Arc<LocalIdSource>,
    ) -> Self {
        MessagesView {
            messages,
            users,
            gate,
            confirm,
            ids,
            state: StateCell::default(),
            sending: PendingSet::new(),
        }
    }

    pub fn snapshot(&self) -> MessagesState {
        self.state.snapshot()
    }

    pub fn thread(&self) -> Vec<Message> {
        self.state.read(|s| s.thread.clone())
    }

    pub fn threads(&self) -> Vec<(UserId, Vec<Message>)> {
        self.state.read(|s| group_by_sender(&s.inbox))
    }

    pub fn is_sending(&self, to: UserId) -> bool {
        self.sending.is_pending(&to)
    }

    pub async fn load_inbox(&self) -> Result<(), ActionError> {
        self.gate.require_user()?;
        let result = self.messages.inbox().await;
        let inbox = self.gate.report(result, None, "Could not load messages")?;
        self.state.update(|s| s.inbox = inbox);
        Ok(())
    }

    /// Opens the conversation with `other`. Reading happens locally right
    /// away; the server is told afterwards and its failure ignored.
    pub async fn select_thread(&self, other: UserId) -> Result<(), ActionError> {
        self.gate.require_user()?;
        self.state.update(|s| {
            s.selected = Some(other);
            s.peer = None;
            s.thread.clear();
            for m in s.inbox.iter_mut().filter(|m| m.sender.id == other) {
                m.read = true;
            }
        });

        let thread = match self.messages.thread(other).await {
            Ok(thread) => thread,
            Err(e) => {
                warn!(user = %other, error = %e, "fetch thread failed");
                Vec::new()
            }
        };
        let peer = self.users.get(other).await.ok();
        self.state.update(|s| {
            // a later selection wins
            if s.selected == Some(other) {
                s.thread = thread;
                s.peer = peer;
            }
        });

        if let Err(e) = self.messages.mark_thread_read(other).await {
            debug!(user = %other, error = %e, "mark thread read failed");
        }
        Ok(())
    }

    pub fn close_thread(&self) {
        self.state.update(|s| {
            s.selected = None;
            s.peer = None;
            s.thread.clear();
        });
    }

    /// Sends to `to`. When that conversation is open the message shows up
    /// at once and is swapped for the stored one.
    pub async fn send(&self, to: UserId, content: &str) -> Result<Option<Message>, ActionError> {
        let me = self.gate.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ActionError::EmptyContent);
        }
        let _pending = self.gate.begin(&self.sending, to)?;

        let local_id = MessageId(self.ids.next());
        let placeholder = Message {
            id: local_id,
            content: content.to_owned(),
            sender: me.as_author(),
            recipient: None,
            created_at: Utc::now(),
            read: false,
        };
        let outgoing = OutgoingMessage {
            recipient_id: to,
            content: content.to_owned(),
        };

        let result = reconcile(
            &self.state,
            |_| (),
            |s| {
                if s.selected == Some(to) {
                    s.thread.push(placeholder);
                }
            },
            self.messages.send(&outgoing),
            |s, server: Option<Message>| {
                if let Some(server) = &server {
                    if let Some(slot) = s.thread.iter_mut().find(|m| m.id == local_id) {
                        *slot = server.clone();
                    }
                }
                server
            },
            |s, ()| s.thread.retain(|m| m.id != local_id),
        )
        .await;

        let sent = self
            .gate
            .report(result, Some("Message sent"), "Could not send the message")?;
        if sent.is_none() {
            self.refetch_thread(to).await;
        }
        self.reload_inbox().await;
        Ok(sent)
    }

    pub async fn edit(&self, message: MessageId, content: &str) -> Result<(), ActionError> {
        self.gate.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            self.gate.notify(Notice::error("Message cannot be empty"));
            return Err(ActionError::EmptyContent);
        }

        let result = self.messages.edit(message, content).await;
        self.gate
            .report(result, Some("Message updated"), "Could not update the message")?;
        self.refresh_after_change().await;
        Ok(())
    }

    pub async fn delete(&self, message: MessageId) -> Result<(), ActionError> {
        self.gate.require_user()?;
        if !self.confirm.confirm("Delete this message?").await {
            return Err(ActionError::Cancelled);
        }

        let result = self.messages.delete(message).await;
        self.gate
            .report(result, Some("Message deleted"), "Could not delete the message")?;
        self.refresh_after_change().await;
        Ok(())
    }

    async fn refresh_after_change(&self) {
        if let Some(other) = self.state.read(|s| s.selected) {
            self.refetch_thread(other).await;
        }
        self.reload_inbox().await;
    }

    async fn reload_inbox(&self) {
        match self.messages.inbox().await {
            Ok(inbox) => self.state.update(|s| s.inbox = inbox),
            Err(e) => warn!(error = %e, "refresh inbox failed"),
        }
    }

    async fn refetch_thread(&self, other: UserId) {
        match self.messages.thread(other).await {
            Ok(thread) => self.state.update(|s| {
                if s.selected == Some(other) {
                    s.thread = thread;
                }
            }),
            Err(e) => warn!(user = %other, error = %e, "refresh thread failed"),
        }
    }

    /// Marks our own messages in the open conversation as read when its
    /// peer reports having read them.
    pub fn apply_messages_read(&self, receipt: &MessagesRead) -> bool {
        let Some(me) = self.gate.auth().user() else {
            return false;
        };
        let applied = self.state.update(|s| {
            if s.selected != Some(receipt.by) {
                return false;
            }
            for m in s.thread.iter_mut().filter(|m| m.sender.id == me.id) {
                m.read = true;
            }
            true
        });
        if applied {
            self.gate.notify(Notice::info("Your messages were read"));
        }
        applied
    }
}

impl MessagesReadListener for MessagesView {
    fn on_messages_read(&self, receipt: &MessagesRead) {
        self.apply_messages_read(receipt);
    }
}

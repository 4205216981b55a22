use crate::application_impl::*;
use crate::application_port::*;
use crate::client::*;
use crate::domain_port::*;
use crate::infra_local::*;
use crate::logger::*;
use crate::settings::Settings;
use crate::state::*;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Every view of the client, wired over one session.
pub struct App {
    pub session: Arc<SessionStore>,
    pub auth: Arc<AuthContext>,
    pub feed: FeedView,
    pub stories: StoryTray,
    pub messages: Arc<MessagesView>,
    pub follows: FollowBook,
    pub requests: IncomingRequests,
    pub notifications: Arc<NotificationCenter>,
    pub profiles: ProfileEditor,
    pub users: UserDirectory,
    pub theme: ThemePreference,
    pub toasts: Arc<ToastCenter>,
    ws_url: String,
    read_listener: ListenerId,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl App {
    pub async fn try_new(
        settings: &Settings,
        navigator: Arc<dyn Navigator>,
        confirm: Arc<dyn Confirm>,
    ) -> anyhow::Result<Self> {
        let local: Arc<dyn LocalStore> = match settings.storage.backend.as_str() {
            "memory" => Arc::new(MemoryLocalStore::new()),
            "file" => Arc::new(FileLocalStore::open(&settings.storage.path).await?),
            other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        };

        let session = Arc::new(SessionStore::new(local.clone()));
        session.restore().await?;

        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(
            &settings.api.base_url,
            Duration::from_secs(settings.api.timeout_secs),
        )?);
        let client = ApiClient::new(transport, session.clone());

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(client.clone()));
        let post_service: Arc<dyn PostService> = Arc::new(RealPostService::new(client.clone()));
        let story_service: Arc<dyn StoryService> = Arc::new(RealStoryService::new(client.clone()));
        let message_service: Arc<dyn MessageService> =
            Arc::new(RealMessageService::new(client.clone()));
        let relationship_service: Arc<dyn RelationshipService> =
            Arc::new(RealRelationshipService::new(client.clone()));
        let notification_service: Arc<dyn NotificationService> =
            Arc::new(RealNotificationService::new(client.clone()));
        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(client));

        let auth = Arc::new(AuthContext::new(session.clone(), auth_service, navigator));
        let toasts = Arc::new(ToastCenter::new());
        let gate = ActionGate::new(auth.clone(), toasts.clone());
        let ids = Arc::new(LocalIdSource::new());

        let feed = FeedView::new(post_service, gate.clone(), confirm.clone(), ids.clone());
        let stories = StoryTray::new(story_service, gate.clone(), confirm.clone(), ids.clone());
        let messages = Arc::new(MessagesView::new(
            message_service,
            user_service.clone(),
            gate.clone(),
            confirm,
            ids,
        ));
        let follows = FollowBook::new(relationship_service.clone(), gate.clone());
        let requests = IncomingRequests::new(relationship_service, gate.clone());
        let users = UserDirectory::new(user_service.clone());
        let profiles = ProfileEditor::new(user_service, gate);

        let notifications = Arc::new(NotificationCenter::new(
            notification_service,
            session.clone(),
        ));
        let read_listener = notifications.add_messages_read_listener(messages.clone());

        let theme = ThemePreference::load(local).await?;

        let cancel = CancellationToken::new();
        let expiry_handle = auth.spawn_expiry_listener(cancel.clone());

        auth.initialize().await;
        debug!(state = ?auth.state(), "client ready");

        Ok(Self {
            session,
            auth,
            feed,
            stories,
            messages,
            follows,
            requests,
            notifications,
            profiles,
            users,
            theme,
            toasts,
            ws_url: settings.realtime.ws_url.clone(),
            read_listener,
            cancel,
            tasks: Mutex::new(vec![expiry_handle]),
        })
    }

    /// Connects the event socket and feeds it to the notification center.
    /// The returned handle finishes when the socket closes or on shutdown.
    pub async fn listen(&self) -> Result<JoinHandle<()>, RealtimeError> {
        let connection = connect(&self.ws_url, &self.session).await?;
        let handler: Arc<dyn ServerEventHandler> = self.notifications.clone();
        Ok(tokio::spawn(run_listener(
            connection,
            handler,
            self.cancel.child_token(),
        )))
    }

    pub async fn shutdown(&self) {
        info!("client shutting down...");

        self.cancel.cancel();
        self.notifications
            .remove_messages_read_listener(self.read_listener);

        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
    }
}

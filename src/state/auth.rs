use crate::application_port::*;
use crate::client::*;
use crate::domain_model::*;
use crate::logger::*;
use crate::state::*;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const LOGIN_PATH: &str = "/login";
/// Pages that stay put when the session expires.
pub const UNAUTHENTICATED_PATHS: [&str; 2] = ["/login", "/register"];

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Loading,
    Authenticated(User),
    Anonymous,
}

/// Process-wide view of who is signed in.
pub struct AuthContext {
    session: Arc<SessionStore>,
    service: Arc<dyn AuthService>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
}

impl AuthContext {
    pub fn new(
        session: Arc<SessionStore>,
        service: Arc<dyn AuthService>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        AuthContext {
            session,
            service,
            navigator,
            state,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        match &*self.state.borrow() {
            AuthState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    fn enter(&self, user: Option<User>) {
        self.session.set_user(user.clone());
        let next = match user {
            Some(user) => AuthState::Authenticated(user),
            None => AuthState::Anonymous,
        };
        self.state.send_replace(next);
    }

    /// Resolves the restored session into a user, or anonymity.
    pub async fn initialize(&self) -> AuthState {
        if !self.session.has_tokens() {
            self.enter(None);
            return self.state();
        }
        match self.service.me().await {
            Ok(user) => {
                info!(user = %user.id, "session resumed");
                self.enter(Some(user));
            }
            Err(e) => {
                debug!(error = %e, "no usable session");
                self.enter(None);
            }
        }
        self.state()
    }

    /// On failure the previous credentials are put back untouched, unless the
    /// session expired during the attempt; it then stays cleared.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let previous = self.session.snapshot();
        match self.try_login(credentials).await {
            Ok(user) => {
                info!(user = %user.id, "signed in");
                self.enter(Some(user.clone()));
                Ok(user)
            }
            Err(e @ AuthError::Api(ApiError::SessionExpired)) => {
                warn!(error = %e, "login failed, session expired");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                if let Err(store) = self.session.replace(previous).await {
                    error!(error = %store, "failed to restore previous session");
                }
                Err(e)
            }
        }
    }

    async fn try_login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let grant = self.service.login(credentials).await?;
        let token = grant.token.ok_or(AuthError::MissingToken)?;
        self.session.save_tokens(token, grant.refresh_token).await?;
        Ok(self.service.me().await?)
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        self.service.register(registration).await?;
        info!(username = %registration.username, "registered");
        self.login(&registration.credentials()).await
    }

    pub async fn logout(&self) {
        let refresh_token = self.session.refresh_token();
        if let Err(e) = self.service.logout(refresh_token.as_ref()).await {
            debug!(error = %e, "logout call failed");
        }
        if let Err(e) = self.session.clear().await {
            error!(error = %e, "failed to clear stored tokens");
        }
        self.enter(None);
        info!("signed out");
        self.navigator.navigate(LOGIN_PATH);
    }

    /// Replaces the cached user after a profile change. Ignored when signed out.
    pub fn update_user(&self, user: User) {
        if self.is_authenticated() {
            self.enter(Some(user));
        }
    }

    pub fn handle_session_expired(&self) {
        self.enter(None);
        let path = self.navigator.current_path();
        if !UNAUTHENTICATED_PATHS.contains(&path.as_str()) {
            self.navigator.navigate(LOGIN_PATH);
        }
    }

    pub fn spawn_expiry_listener(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mut signals = self.session.subscribe();
        let auth = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    signal = signals.recv() => match signal {
                        Ok(SessionSignal::Expired) | Err(RecvError::Lagged(_)) => {
                            auth.handle_session_expired();
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn assume(&self, user: User) {
        self.enter(Some(user));
    }

    #[cfg(test)]
    pub(crate) fn assume_anonymous(&self) {
        self.enter(None);
    }
}

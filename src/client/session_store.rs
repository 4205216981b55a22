use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

const SIGNAL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    Expired,
}

/// Owns the credential pair and the cached current user. Memory is updated
/// before the local store is written, so readers never wait on disk.
pub struct SessionStore {
    local: Arc<dyn LocalStore>,
    state: RwLock<Session>,
    signals: broadcast::Sender<SessionSignal>,
}

impl SessionStore {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        SessionStore {
            local,
            state: RwLock::new(Session::default()),
            signals,
        }
    }

    pub async fn restore(&self) -> Result<(), StoreError> {
        let access_token = self.local.get(TOKEN_KEY).await?.map(AccessToken);
        let refresh_token = self.local.get(REFRESH_TOKEN_KEY).await?.map(RefreshToken);
        debug!(
            has_access = access_token.is_some(),
            has_refresh = refresh_token.is_some(),
            "session restored"
        );
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.access_token = access_token;
        state.refresh_token = refresh_token;
        Ok(())
    }

    pub fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    pub fn has_tokens(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.access_token.is_some() || state.refresh_token.is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user = user;
    }

    /// Stores a new pair. Without a new refresh token the old one is kept.
    pub async fn save_tokens(
        &self,
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
    ) -> Result<(), StoreError> {
        let refresh_token = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.access_token = Some(access_token.clone());
            if refresh_token.is_some() {
                state.refresh_token = refresh_token;
            }
            state.refresh_token.clone()
        };

        self.local.set(TOKEN_KEY, &access_token.0).await?;
        if let Some(refresh_token) = refresh_token {
            self.local.set(REFRESH_TOKEN_KEY, &refresh_token.0).await?;
        }
        Ok(())
    }

    /// Puts back a session taken earlier with `snapshot`, tokens and user alike.
    pub async fn replace(&self, session: Session) -> Result<(), StoreError> {
        let (access_token, refresh_token) = (
            session.access_token.clone(),
            session.refresh_token.clone(),
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = session;

        match access_token {
            Some(token) => self.local.set(TOKEN_KEY, &token.0).await?,
            None => self.local.remove(TOKEN_KEY).await?,
        }
        match refresh_token {
            Some(token) => self.local.set(REFRESH_TOKEN_KEY, &token.0).await?,
            None => self.local.remove(REFRESH_TOKEN_KEY).await?,
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.replace(Session::default()).await
    }

    /// Drops the session after an unrecoverable refresh failure and tells
    /// every subscriber exactly once.
    pub async fn expire(&self) {
        if let Err(e) = self.clear().await {
            error!(error = %e, "failed to clear stored tokens");
        }
        info!("session expired");
        // no subscriber is fine
        let _ = self.signals.send(SessionSignal::Expired);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }
}

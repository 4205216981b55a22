//! Local-first mutations: apply a placeholder right away, then keep it or
//! undo it depending on what the backend says.

use crate::client::ApiError;
use crate::domain_model::User;
use crate::logger::*;
use crate::state::*;
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub const SIGN_IN_REQUIRED: &str = "You must be signed in";

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error("already in progress")]
    Pending,
    #[error("content is empty")]
    EmptyContent,
    #[error("cancelled")]
    Cancelled,
    #[error("invalid profile: {0}")]
    Invalid(ProfileErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Hands out negative ids for entities the server has not confirmed yet.
pub struct LocalIdSource {
    next: AtomicI64,
}

impl LocalIdSource {
    pub fn new() -> Self {
        LocalIdSource {
            next: AtomicI64::new(-1),
        }
    }

    pub fn next(&self) -> i64 {
        self.next.fetch_sub(1, Ordering::Relaxed)
    }
}

impl Default for LocalIdSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys with an action in flight.
pub struct PendingSet<K: Eq + Hash> {
    keys: Arc<DashMap<K, ()>>,
}

impl<K: Eq + Hash + Clone> PendingSet<K> {
    pub fn new() -> Self {
        PendingSet {
            keys: Arc::new(DashMap::new()),
        }
    }

    /// `None` when `key` already has an action in flight.
    pub fn try_begin(&self, key: K) -> Option<PendingGuard<K>> {
        if self.keys.insert(key.clone(), ()).is_some() {
            return None;
        }
        Some(PendingGuard {
            keys: self.keys.clone(),
            key,
        })
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.keys.contains_key(key)
    }
}

impl<K: Eq + Hash + Clone> Default for PendingSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the pending flag when dropped, whatever path the action took.
pub struct PendingGuard<K: Eq + Hash> {
    keys: Arc<DashMap<K, ()>>,
    key: K,
}

impl<K: Eq + Hash> Drop for PendingGuard<K> {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

/// View state behind a plain mutex. Closures run synchronously, so the lock
/// is never held across an await.
pub struct StateCell<S> {
    inner: Mutex<S>,
}

impl<S> StateCell<S> {
    pub fn new(state: S) -> Self {
        StateCell {
            inner: Mutex::new(state),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<S: Clone> StateCell<S> {
    pub fn snapshot(&self) -> S {
        self.read(S::clone)
    }
}

impl<S: Default> Default for StateCell<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

/// Snapshots and applies under one lock, awaits `request`, then either merges
/// the server answer or puts the snapshot back.
pub async fn reconcile<S, Snap, T, R, Fut>(
    cell: &StateCell<S>,
    snapshot: impl FnOnce(&S) -> Snap,
    apply: impl FnOnce(&mut S),
    request: Fut,
    confirm: impl FnOnce(&mut S, T) -> R,
    rollback: impl FnOnce(&mut S, Snap),
) -> Result<R, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    let saved = cell.update(|state| {
        let saved = snapshot(state);
        apply(state);
        saved
    });

    match request.await {
        Ok(answer) => Ok(cell.update(|state| confirm(state, answer))),
        Err(e) => {
            debug!(error = %e, "rolling back optimistic change");
            cell.update(|state| rollback(state, saved));
            Err(e)
        }
    }
}

/// Preconditions and notices shared by every user action.
#[derive(Clone)]
pub struct ActionGate {
    auth: Arc<AuthContext>,
    notices: Arc<dyn NoticeSink>,
}

impl ActionGate {
    pub fn new(auth: Arc<AuthContext>, notices: Arc<dyn NoticeSink>) -> Self {
        ActionGate { auth, notices }
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    pub fn notify(&self, notice: Notice) {
        self.notices.show(notice);
    }

    /// The signed-in user, or a blocking notice and `NotAuthenticated`.
    pub fn require_user(&self) -> Result<User, ActionError> {
        match self.auth.user() {
            Some(user) => Ok(user),
            None => {
                self.notices.show(Notice::blocking(SIGN_IN_REQUIRED));
                Err(ActionError::NotAuthenticated)
            }
        }
    }

    pub fn begin<K: Eq + Hash + Clone>(
        &self,
        pending: &PendingSet<K>,
        key: K,
    ) -> Result<PendingGuard<K>, ActionError> {
        pending.try_begin(key).ok_or(ActionError::Pending)
    }

    /// Turns an outcome into a notice: backend wording on rejection, the
    /// fallback otherwise.
    pub fn report<T>(
        &self,
        result: Result<T, ApiError>,
        success: Option<&str>,
        failure: &str,
    ) -> Result<T, ActionError> {
        match result {
            Ok(value) => {
                if let Some(success) = success {
                    self.notices.show(Notice::success(success));
                }
                Ok(value)
            }
            Err(e) => {
                self.notices.show(Notice::error(e.notice(failure)));
                Err(ActionError::Api(e))
            }
        }
    }
}

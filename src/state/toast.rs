use crate::state::*;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

const TOAST_ID_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: String,
    pub notice: Notice,
    shown_at: Instant,
}

impl Toast {
    fn expired(&self, now: Instant) -> bool {
        !self.notice.blocking && now.duration_since(self.shown_at) >= self.notice.duration
    }
}

/// The stack of notices currently on screen.
#[derive(Default)]
pub struct ToastCenter {
    toasts: Mutex<Vec<Toast>>,
}

impl ToastCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notice: Notice) -> String {
        let id = nanoid::nanoid!(TOAST_ID_LEN);
        let toast = Toast {
            id: id.clone(),
            notice,
            shown_at: Instant::now(),
        };
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(toast);
        id
    }

    pub fn dismiss(&self, id: &str) -> bool {
        let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }

    /// Drops expired toasts and returns the rest, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        self.active_at(Instant::now())
    }

    fn active_at(&self, now: Instant) -> Vec<Toast> {
        let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
        toasts.retain(|t| !t.expired(now));
        toasts.clone()
    }

    /// Removes and returns everything, expired or not.
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.toasts.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl NoticeSink for ToastCenter {
    fn show(&self, notice: Notice) {
        self.push(notice);
    }
}

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_millis(3500);

// region navigation

pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

pub struct MemoryNavigator {
    path: RwLock<String>,
}

impl MemoryNavigator {
    pub fn new(path: &str) -> Self {
        MemoryNavigator {
            path: RwLock::new(path.to_owned()),
        }
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigate");
        *self.path.write().unwrap_or_else(PoisonError::into_inner) = path.to_owned();
    }
}

// endregion

// region notices

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub duration: Duration,
    /// Must be acknowledged instead of fading out.
    pub blocking: bool,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Notice {
            level,
            text: text.into(),
            duration: DEFAULT_NOTICE_DURATION,
            blocking: false,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }

    pub fn blocking(text: impl Into<String>) -> Self {
        Notice {
            blocking: true,
            ..Self::new(NoticeLevel::Error, text)
        }
    }

    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

pub trait NoticeSink: Send + Sync {
    fn show(&self, notice: Notice);
}

// endregion

// region confirmation

#[async_trait::async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, question: &str) -> bool;
}

/// Answers every question the same way.
pub struct AutoConfirm(pub bool);

#[async_trait::async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

// endregion

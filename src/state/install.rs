use crate::logger::*;
use crate::state::*;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

const OUTCOME_NOTICE: Duration = Duration::from_millis(3000);
const FAILURE_NOTICE: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// A platform install prompt that was offered earlier and kept for later.
#[async_trait::async_trait]
pub trait DeferredPrompt: Send + Sync {
    async fn prompt(&self) -> anyhow::Result<InstallOutcome>;
}

pub struct InstallPrompt {
    deferred: Mutex<Option<Arc<dyn DeferredPrompt>>>,
    available: watch::Sender<bool>,
    notices: Arc<dyn NoticeSink>,
}

impl InstallPrompt {
    pub fn new(notices: Arc<dyn NoticeSink>) -> Self {
        let (available, _) = watch::channel(false);
        InstallPrompt {
            deferred: Mutex::new(None),
            available,
            notices,
        }
    }

    pub fn offer(&self, prompt: Arc<dyn DeferredPrompt>) {
        *self.deferred.lock().unwrap_or_else(PoisonError::into_inner) = Some(prompt);
        self.available.send_replace(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.available.subscribe()
    }

    pub fn is_available(&self) -> bool {
        *self.available.borrow()
    }

    /// Shows the kept prompt once. `None` when nothing was offered.
    pub async fn install(&self) -> Option<InstallOutcome> {
        let prompt = self
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        let outcome = prompt.prompt().await;
        self.available.send_replace(false);
        match outcome {
            Ok(InstallOutcome::Accepted) => {
                self.notices
                    .show(Notice::success("App installed").lasting(OUTCOME_NOTICE));
                Some(InstallOutcome::Accepted)
            }
            Ok(InstallOutcome::Dismissed) => {
                self.notices
                    .show(Notice::info("Installation cancelled").lasting(OUTCOME_NOTICE));
                Some(InstallOutcome::Dismissed)
            }
            Err(e) => {
                warn!(error = %e, "install prompt failed");
                self.notices
                    .show(Notice::error("Could not install").lasting(FAILURE_NOTICE));
                None
            }
        }
    }
}

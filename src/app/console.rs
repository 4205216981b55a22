use crate::logger::*;
use crate::state::*;
use std::io::{BufRead, Write};
use std::sync::{PoisonError, RwLock};

/// Tracks the logical screen so expiry redirects are visible in the log.
pub struct ConsoleNavigator {
    path: RwLock<String>,
}

impl ConsoleNavigator {
    pub fn new() -> Self {
        ConsoleNavigator {
            path: RwLock::new("/".to_owned()),
        }
    }
}

impl Default for ConsoleNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for ConsoleNavigator {
    fn current_path(&self) -> String {
        self.path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        if path == LOGIN_PATH {
            info!("signed out, run `trohm login` to continue");
        }
        *self.path.write().unwrap_or_else(PoisonError::into_inner) = path.to_owned();
    }
}

/// Asks on the terminal. `assume_yes` skips the question.
pub struct StdinConfirm {
    pub assume_yes: bool,
}

#[async_trait::async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let question = question.to_owned();
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{question} [y/N] ");
            std::io::stderr().flush().ok();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => matches!(line.trim(), "y" | "Y" | "yes"),
            Ok(Err(e)) => {
                warn!(error = %e, "could not read answer");
                false
            }
            Err(e) => {
                warn!(error = %e, "confirmation task failed");
                false
            }
        }
    }
}

/// Prints and clears every pending toast.
pub fn flush_toasts(toasts: &ToastCenter) {
    for toast in toasts.drain() {
        let marker = match toast.notice.level {
            NoticeLevel::Info => "i",
            NoticeLevel::Success => "+",
            NoticeLevel::Error => "!",
        };
        eprintln!("[{marker}] {}", toast.notice.text);
    }
}

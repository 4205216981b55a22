use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{Local, Timelike};
use std::sync::{Arc, PoisonError, RwLock};

/// The user's light/dark choice, kept in local storage.
pub struct ThemePreference {
    local: Arc<dyn LocalStore>,
    choice: RwLock<ThemeChoice>,
}

impl ThemePreference {
    pub async fn load(local: Arc<dyn LocalStore>) -> Result<Self, StoreError> {
        let choice = match local.get(THEME_KEY).await? {
            Some(raw) => raw.parse::<ThemeChoice>().unwrap_or_else(|e| {
                warn!(error = %e, "ignoring stored theme");
                ThemeChoice::default()
            }),
            None => ThemeChoice::default(),
        };
        Ok(ThemePreference {
            local,
            choice: RwLock::new(choice),
        })
    }

    pub fn choice(&self) -> ThemeChoice {
        *self.choice.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn resolved(&self) -> ThemeMode {
        self.choice().resolve(Local::now().hour())
    }

    pub async fn set(&self, choice: ThemeChoice) -> Result<(), StoreError> {
        *self.choice.write().unwrap_or_else(PoisonError::into_inner) = choice;
        self.local.set(THEME_KEY, choice.as_str()).await
    }

    pub async fn cycle(&self) -> Result<ThemeChoice, StoreError> {
        let next = self.choice().next();
        self.set(next).await?;
        Ok(next)
    }
}

use crate::application_port::UserService;
use crate::domain_model::*;
use crate::state::*;
use std::fmt;
use std::sync::Arc;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_BIO_LEN: usize = 160;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileErrors {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.bio.is_none() && self.avatar_url.is_none()
    }
}

impl fmt::Display for ProfileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.username, &self.bio, &self.avatar_url]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        f.write_str(&parts.join("; "))
    }
}

pub fn validate_profile(update: &ProfileUpdate) -> Result<(), ProfileErrors> {
    let mut errors = ProfileErrors::default();
    if update.username.trim().chars().count() < MIN_USERNAME_LEN {
        errors.username = Some(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        ));
    }
    if update.bio.chars().count() > MAX_BIO_LEN {
        errors.bio = Some(format!("Bio cannot exceed {MAX_BIO_LEN} characters"));
    }
    if !update.avatar_url.is_empty() {
        let lower = update.avatar_url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            errors.avatar_url = Some("Avatar URL must start with http:// or https://".to_owned());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub struct ProfileEditor {
    users: Arc<dyn UserService>,
    gate: ActionGate,
    saving: PendingSet<UserId>,
}

impl ProfileEditor {
    pub fn new(users: Arc<dyn UserService>, gate: ActionGate) -> Self {
        ProfileEditor {
            users,
            gate,
            saving: PendingSet::new(),
        }
    }

    pub async fn load(&self, user: UserId) -> Result<User, ActionError> {
        let result = self.users.get(user).await;
        self.gate.report(result, None, "User not found")
    }

    /// Saving one's own profile also refreshes the signed-in user.
    pub async fn save(&self, user: UserId, update: &ProfileUpdate) -> Result<User, ActionError> {
        let me = self.gate.require_user()?;
        if let Err(errors) = validate_profile(update) {
            self.gate.notify(Notice::error(errors.to_string()));
            return Err(ActionError::Invalid(errors));
        }
        let _saving = self.gate.begin(&self.saving, user)?;

        let result = self.users.update(user, update).await;
        let updated = self
            .gate
            .report(result, Some("Profile updated"), "Could not update the profile")?;
        if updated.id == me.id {
            self.gate.auth().update_user(updated.clone());
        }
        Ok(updated)
    }
}
